//! Harbor & Pine Core - domain types and store rules.
//!
//! This crate is shared by every Harbor & Pine component:
//! - `storefront` - Public-facing shop (catalog, cart, checkout, tracking)
//! - `admin` - Store administration console
//! - `cli` - Dataset validation and pricing tools
//!
//! # Architecture
//!
//! The core crate holds records and pure functions over them - no I/O, no
//! HTTP. The web binaries keep a [`Dataset`] in memory and call into these
//! modules from their handlers.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, money, emails and status enums
//! - [`catalog`] - Products, categories, filtering, sorting, pagination
//! - [`cart`] - Cart lines and the subtotal/shipping/tax/total formula
//! - [`coupon`] - Discount coupons and their applicability rules
//! - [`checkout`] - Checkout steps and form validation
//! - [`order`] - Placed orders and the tracking timeline
//! - [`settings`] - Store settings
//! - [`dataset`] - The seeded in-memory dataset

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod coupon;
pub mod dataset;
pub mod order;
pub mod settings;
pub mod types;
pub mod user;
pub mod validation;

pub use dataset::{Dataset, DatasetError};
pub use types::*;
