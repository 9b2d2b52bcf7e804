//! Session-related types.
//!
//! Everything a visitor accumulates lives in the session: the signed-in
//! user, the cart, checkout progress and one-shot flash messages.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use harbor_core::cart::Cart;
use harbor_core::checkout::Checkout;
use harbor_core::user::User;
use harbor_core::{Email, UserId};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's dataset ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Shown in the header.
    pub first_name: String,
}

impl CurrentUser {
    /// Identity for a dataset user, `None` if the stored email is invalid.
    #[must_use]
    pub fn from_user(user: &User) -> Option<Self> {
        Some(Self {
            id: user.id,
            email: Email::parse(&user.email).ok()?,
            first_name: user.first_name.clone(),
        })
    }
}

/// Severity of a flash message, used as the toast's CSS modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Success,
    Info,
    Error,
}

impl FlashKind {
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self {
            Self::Success => "toast toast-success",
            Self::Info => "toast toast-info",
            Self::Error => "toast toast-error",
        }
    }
}

/// A message shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the visitor's cart.
    pub const CART: &str = "cart";

    /// Key for checkout progress.
    pub const CHECKOUT: &str = "checkout";

    /// Key for the pending flash message.
    pub const FLASH: &str = "flash";

    /// Key for order numbers this visitor may view without signing in.
    pub const TRACKED_ORDERS: &str = "tracked_orders";
}

/// Most order numbers remembered per session.
const MAX_TRACKED_ORDERS: usize = 20;

// =============================================================================
// Session Helpers
// =============================================================================

/// The visitor's cart, empty if none has been stored yet.
pub async fn load_cart(session: &Session) -> Cart {
    session
        .get::<Cart>(keys::CART)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Store the visitor's cart.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save_cart(
    session: &Session,
    cart: &Cart,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::CART, cart).await
}

/// Checkout progress, empty if checkout has not started.
pub async fn load_checkout(session: &Session) -> Checkout {
    session
        .get::<Checkout>(keys::CHECKOUT)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Store checkout progress.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save_checkout(
    session: &Session,
    checkout: &Checkout,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::CHECKOUT, checkout).await
}

/// Forget checkout progress.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_checkout(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<Checkout>(keys::CHECKOUT).await?;
    Ok(())
}

/// Queue a flash message for the next page.
///
/// Failures are logged and otherwise ignored; a lost toast is not worth
/// failing the request over.
pub async fn flash(session: &Session, flash: Flash) {
    if let Err(e) = session.insert(keys::FLASH, flash).await {
        tracing::warn!(error = %e, "Failed to store flash message");
    }
}

/// Take the pending flash message, if any.
pub async fn take_flash(session: &Session) -> Option<Flash> {
    session.remove::<Flash>(keys::FLASH).await.ok().flatten()
}

/// Order numbers this visitor placed or looked up with the matching email.
pub async fn tracked_orders(session: &Session) -> Vec<String> {
    session
        .get::<Vec<String>>(keys::TRACKED_ORDERS)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Let this visitor view `number` again without re-entering the email.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn remember_order(
    session: &Session,
    number: &str,
) -> Result<(), tower_sessions::session::Error> {
    let mut numbers = tracked_orders(session).await;
    numbers.retain(|n| n != number);
    numbers.push(number.to_string());
    if numbers.len() > MAX_TRACKED_ORDERS {
        numbers.remove(0);
    }
    session.insert(keys::TRACKED_ORDERS, numbers).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_flash_is_shown_once() {
        let session = session();
        flash(&session, Flash::success("Added to cart")).await;

        let shown = take_flash(&session).await.unwrap();
        assert_eq!(shown.message, "Added to cart");
        assert_eq!(shown.kind.css_class(), "toast toast-success");
        assert!(take_flash(&session).await.is_none());
    }

    #[tokio::test]
    async fn test_cart_defaults_to_empty() {
        let session = session();
        assert!(load_cart(&session).await.is_empty());

        let cart = Cart {
            coupon_code: Some("WELCOME10".to_string()),
            ..Cart::default()
        };
        save_cart(&session, &cart).await.unwrap();
        assert_eq!(load_cart(&session).await, cart);
    }

    #[tokio::test]
    async fn test_clear_checkout() {
        let session = session();
        save_checkout(&session, &Checkout::default()).await.unwrap();
        clear_checkout(&session).await.unwrap();
        assert_eq!(load_checkout(&session).await, Checkout::default());
    }

    #[tokio::test]
    async fn test_remembered_orders_are_deduplicated() {
        let session = session();
        remember_order(&session, "HP-1001").await.unwrap();
        remember_order(&session, "HP-1002").await.unwrap();
        remember_order(&session, "HP-1001").await.unwrap();

        assert_eq!(tracked_orders(&session).await, ["HP-1002", "HP-1001"]);
    }
}
