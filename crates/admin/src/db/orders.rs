//! Order repository.

use chrono::{DateTime, Utc};
use rand::Rng;

use harbor_core::order::Order;
use harbor_core::{OrderId, OrderStatus};

use super::{RepositoryError, Store};

/// Repository for order operations.
pub struct OrderRepository<'a> {
    store: &'a Store,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: OrderId) -> Option<Order> {
        self.store.read().await.order(id).cloned()
    }

    /// Move an order to `next`. Shipping assigns a tracking number if the
    /// order has none.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id and
    /// `RepositoryError::Transition` if `next` is not reachable from the
    /// order's current status.
    pub async fn update_status(
        &self,
        id: OrderId,
        next: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<Order, RepositoryError> {
        let mut dataset = self.store.write().await;
        let order = dataset
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(RepositoryError::NotFound)?;
        order.apply_status(next, generate_tracking_number, now)?;
        Ok(order.clone())
    }
}

/// Carrier-style tracking number, e.g. `1ZHP0384726615`.
fn generate_tracking_number() -> String {
    let digits: u64 = rand::rng().random_range(0..10_000_000_000);
    format!("1ZHP{digits:010}")
}
