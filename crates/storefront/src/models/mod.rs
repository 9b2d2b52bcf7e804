//! Storefront models.
//!
//! Domain records come from `harbor-core`; this module only holds what the
//! storefront keeps per visitor.

pub mod session;

pub use session::{CurrentUser, Flash, FlashKind, keys as session_keys};
