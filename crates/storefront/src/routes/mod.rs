//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                              - Home page
//! GET  /health                        - Health check
//! GET  /health/ready                  - Readiness check
//!
//! # Catalog
//! GET  /products                      - Product listing (filter, sort, paginate)
//! GET  /products/{slug}               - Product detail
//! GET  /categories                    - Category listing
//! GET  /categories/{slug}             - Listing restricted to one category
//! GET  /search                        - Full-text search
//! GET  /search/suggest                - Suggestions fragment
//!
//! # Cart
//! GET  /cart                          - Cart page
//! POST /cart/add                      - Add a variant
//! POST /cart/update                   - Change a line's quantity
//! POST /cart/remove                   - Remove a line
//! POST /cart/coupon                   - Apply a coupon code
//! POST /cart/coupon/remove            - Drop the coupon
//! GET  /cart/count                    - Cart count badge (fragment)
//!
//! # Checkout
//! GET  /checkout                      - Redirect to the current step
//! GET  /checkout/shipping             - Shipping form
//! POST /checkout/shipping             - Validate shipping
//! GET  /checkout/payment              - Payment form
//! POST /checkout/payment              - Validate payment
//! GET  /checkout/review               - Review order
//! POST /checkout/place                - Place the order
//! GET  /checkout/confirmation/{number} - Confirmation
//!
//! # Orders
//! GET  /orders/track                  - Tracking lookup form
//! POST /orders/track                  - Look up by number + email
//! GET  /orders/{number}               - Tracking detail
//!
//! # Auth (rate limited POSTs)
//! GET  /auth/login                    - Login page
//! POST /auth/login                    - Login action
//! GET  /auth/register                 - Register page
//! POST /auth/register                 - Register action
//! POST /auth/logout                   - Logout action
//!
//! # Account (requires auth)
//! GET  /account                       - Account overview
//! GET  /account/orders                - Order history
//!
//! # Content
//! GET  /pages/{slug}                  - Markdown page
//! GET  /contact                       - Contact form
//! POST /contact                       - Send message (rate limited)
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod checkout;
pub mod contact;
pub mod home;
pub mod orders;
pub mod pages;
pub mod products;
pub mod search;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::form_rate_limiter;
use crate::state::AppState;

/// `target` if it is a path on this site, otherwise `fallback`.
///
/// Guards redirect parameters (`next`, `return_to`) against being pointed
/// at another host.
#[must_use]
pub fn local_path(target: Option<&str>, fallback: &str) -> String {
    match target.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => fallback.to_string(),
    }
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{slug}", get(products::show))
}

/// Create the category routes router.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(categories::index))
        .route("/{slug}", get(categories::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/coupon", post(cart::apply_coupon))
        .route("/coupon/remove", post(cart::remove_coupon))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::index))
        .route(
            "/shipping",
            get(checkout::shipping_page).post(checkout::submit_shipping),
        )
        .route(
            "/payment",
            get(checkout::payment_page).post(checkout::submit_payment),
        )
        .route("/review", get(checkout::review))
        .route("/place", post(checkout::place))
        .route("/confirmation/{number}", get(checkout::confirmation))
}

/// Create the order tracking routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/track", get(orders::track_page).post(orders::track))
        .route("/{number}", get(orders::show))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index))
        .route("/orders", get(account::orders))
}

/// Form posts that accept free-form input, behind the per-IP limiter.
///
/// Merged with the GET routes below; axum combines the method routers of
/// identical paths.
fn limited_form_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/contact", post(contact::submit))
        .layer(form_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        // Catalog
        .nest("/products", product_routes())
        .nest("/categories", category_routes())
        .route("/search", get(search::search))
        .route("/search/suggest", get(search::suggest))
        // Cart and checkout
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/orders", order_routes())
        // Auth
        .route("/auth/login", get(auth::login_page))
        .route("/auth/register", get(auth::register_page))
        .route("/auth/logout", post(auth::logout))
        // Account
        .nest("/account", account_routes())
        // Content
        .route("/pages/{slug}", get(pages::show))
        .route("/contact", get(contact::page))
        .merge(limited_form_routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_path() {
        assert_eq!(local_path(Some("/account/orders"), "/"), "/account/orders");
        assert_eq!(local_path(Some("//evil.example"), "/"), "/");
        assert_eq!(local_path(Some("https://evil.example"), "/"), "/");
        assert_eq!(local_path(Some("/\\evil.example"), "/"), "/");
        assert_eq!(local_path(None, "/cart"), "/cart");
    }
}
