//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                         - Liveness check
//! GET  /health/ready                   - Readiness (dataset integrity)
//!
//! # Auth (simulated: any admin-role email signs in)
//! GET  /auth/login                     - Sign-in page
//! POST /auth/login                     - Sign in
//! POST /auth/logout                    - Sign out
//!
//! # Dashboard
//! GET  /                               - Revenue, counts, low stock, recent orders
//!
//! # Products
//! GET  /products                       - Product table (search, filters, sort)
//! GET  /products/new                   - New product form
//! POST /products/new                   - Create product
//! GET  /products/{id}/edit             - Edit form
//! POST /products/{id}/edit             - Save product
//! POST /products/{id}/delete           - Delete (refused once ordered)
//! POST /products/{id}/status           - Toggle active/draft
//! POST /products/{id}/variants/{vid}/stock - Set a variant's stock
//!
//! # Orders
//! GET  /orders                         - Order table with status tabs
//! GET  /orders/{id}                    - Order detail
//! POST /orders/{id}/status             - Advance the order status
//!
//! # Customers
//! GET  /customers                      - Customer table
//! GET  /customers/{id}                 - Customer detail and order history
//!
//! # Coupons
//! GET  /coupons                        - Coupon list
//! GET  /coupons/new                    - New coupon form
//! POST /coupons/new                    - Create coupon
//! GET  /coupons/{id}/edit              - Edit form
//! POST /coupons/{id}/edit              - Save coupon
//! POST /coupons/{id}/deactivate        - Deactivate
//! POST /coupons/{id}/delete            - Delete
//!
//! # Settings
//! GET  /settings                       - Store settings form
//! POST /settings                       - Save settings
//! ```

use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod coupons;
pub mod customers;
pub mod dashboard;
pub mod orders;
pub mod products;
pub mod settings;

/// Build the admin router (without middleware or health checks).
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(dashboard::router())
        .merge(products::router())
        .merge(orders::router())
        .merge(customers::router())
        .merge(coupons::router())
        .merge(settings::router())
}
