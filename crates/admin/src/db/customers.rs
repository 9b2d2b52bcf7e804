//! Customer repository.
//!
//! Customers are the customer-role users. Their orders are the ones placed
//! from their account or with their email address.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use harbor_core::order::Order;
use harbor_core::user::User;
use harbor_core::{Dataset, OrderStatus, UserId, UserRole};

use super::Store;

/// A customer with their order totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerSummary {
    pub user: User,
    pub order_count: usize,
    /// Sum of order totals, cancelled orders excluded.
    pub lifetime_spend: Decimal,
    pub last_order_at: Option<DateTime<Utc>>,
}

impl CustomerSummary {
    fn new(dataset: &Dataset, user: &User) -> Self {
        let orders = dataset.orders_for_user(user);
        Self {
            user: user.clone(),
            order_count: orders.len(),
            lifetime_spend: lifetime_spend(orders.iter().copied()),
            last_order_at: orders.first().map(|o| o.placed_at),
        }
    }
}

/// A customer and their orders, newest first.
#[derive(Debug, Clone)]
pub struct CustomerDetail {
    pub summary: CustomerSummary,
    pub orders: Vec<Order>,
}

/// Total spent across `orders`, ignoring cancelled ones.
pub fn lifetime_spend<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Decimal {
    orders
        .into_iter()
        .filter(|o| o.status != OrderStatus::Cancelled)
        .map(|o| o.total)
        .sum()
}

/// Repository for customer lookups.
pub struct CustomerRepository<'a> {
    store: &'a Store,
}

impl<'a> CustomerRepository<'a> {
    /// Create a new customer repository.
    #[must_use]
    pub const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Customers whose name or email contains `query` (case-insensitive),
    /// newest account first. A blank query lists everyone.
    pub async fn search(&self, query: &str) -> Vec<CustomerSummary> {
        let query = query.trim().to_lowercase();
        let dataset = self.store.read().await;
        let mut customers: Vec<CustomerSummary> = dataset
            .users
            .iter()
            .filter(|u| u.role == UserRole::Customer)
            .filter(|u| {
                query.is_empty()
                    || u.email.to_lowercase().contains(&query)
                    || u.full_name().to_lowercase().contains(&query)
            })
            .map(|u| CustomerSummary::new(&dataset, u))
            .collect();
        customers.sort_by(|a, b| b.user.created_at.cmp(&a.user.created_at));
        customers
    }

    pub async fn get(&self, id: UserId) -> Option<CustomerDetail> {
        let dataset = self.store.read().await;
        let user = dataset.user(id).filter(|u| u.role == UserRole::Customer)?;
        Some(CustomerDetail {
            summary: CustomerSummary::new(&dataset, user),
            orders: dataset
                .orders_for_user(user)
                .into_iter()
                .cloned()
                .collect(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::new(Dataset::seed().unwrap())
    }

    #[tokio::test]
    async fn test_search_excludes_admins() {
        let store = store();
        let everyone = CustomerRepository::new(&store).search("").await;
        assert!(!everyone.is_empty());
        assert!(everyone.iter().all(|c| c.user.role == UserRole::Customer));
    }

    #[tokio::test]
    async fn test_search_matches_name_and_email() {
        let store = store();
        let repo = CustomerRepository::new(&store);
        let by_name = repo.search("reyes").await;
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name.first().unwrap().user.email, "ana@example.com");

        let by_email = repo.search("JON@").await;
        assert_eq!(by_email.len(), 1);
        assert!(repo.search("nobody-here").await.is_empty());
    }

    #[tokio::test]
    async fn test_lifetime_spend_skips_cancelled_orders() {
        let store = store();
        let dataset = store.read().await;
        for user in dataset.users.iter().filter(|u| u.role == UserRole::Customer) {
            let orders = dataset.orders_for_user(user);
            let expected: Decimal = orders
                .iter()
                .filter(|o| o.status != OrderStatus::Cancelled)
                .map(|o| o.total)
                .sum();
            assert_eq!(CustomerSummary::new(&dataset, user).lifetime_spend, expected);
        }
    }

    #[tokio::test]
    async fn test_get_detail() {
        let store = store();
        let repo = CustomerRepository::new(&store);
        let detail = repo.get(UserId::new(2)).await.unwrap();
        assert_eq!(detail.orders.len(), detail.summary.order_count);
        assert!(repo.get(UserId::new(1)).await.is_none());
    }
}
