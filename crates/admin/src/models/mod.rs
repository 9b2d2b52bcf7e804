//! Domain models for admin.
//!
//! Records come from `harbor-core`; this module holds the admin's session
//! identity and the product and coupon edit forms.

pub mod coupon;
pub mod product;
pub mod session;

pub use coupon::{CouponForm, CouponInput};
pub use product::{ProductForm, ProductInput};
pub use session::{CurrentAdmin, Flash, FlashKind, keys as session_keys};
