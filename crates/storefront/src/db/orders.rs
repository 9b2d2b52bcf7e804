//! Order repository: placing orders and looking them up for tracking.

use chrono::{DateTime, Utc};

use harbor_core::cart::Cart;
use harbor_core::checkout::Checkout;
use harbor_core::dataset::PlaceOrderError;
use harbor_core::order::{Order, normalize_order_number};
use harbor_core::user::User;
use harbor_core::UserId;

use super::Store;

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

    /// Get an order by its number, as typed by a shopper.
    pub async fn get_by_number(&self, number: &str) -> Option<Order> {
        let number = normalize_order_number(number);
        self.store.read().await.order_by_number(&number).cloned()
    }

    /// Guest tracking lookup: the order number must match an order placed
    /// with `email`. A wrong email is indistinguishable from a wrong number.
    pub async fn find_for_tracking(&self, number: &str, email: &str) -> Option<Order> {
        self.get_by_number(number)
            .await
            .filter(|order| order.placed_by(email))
    }

    /// Orders placed by a signed-in user, newest first.
    pub async fn for_user(&self, user: &User) -> Vec<Order> {
        self.store
            .read()
            .await
            .orders_for_user(user)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Place an order for a completed checkout.
    ///
    /// # Errors
    ///
    /// Returns `PlaceOrderError` if the cart changed, its coupon lapsed or
    /// the checkout is incomplete. In the first two cases `cart` has already
    /// been reconciled.
    pub async fn place(
        &self,
        checkout: &Checkout,
        cart: &mut Cart,
        user_id: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Result<Order, PlaceOrderError> {
        let order = self
            .store
            .write()
            .await
            .place_order(checkout, cart, user_id, now)?;

        tracing::info!(
            order_number = %order.number,
            items = order.item_count(),
            total = %order.total,
            "Order placed"
        );
        Ok(order)
    }
}
