//! HTTP middleware stack for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers (stricter CSP for admin)
//! 5. Session layer (tower-sessions, in-memory store)
//!
//! Authentication is enforced per handler with [`RequireAdminAuth`].

pub mod auth;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    OptionalAdminAuth, RequireAdminAuth, clear_current_admin, current_admin, set_current_admin,
};
pub use request_id::{RequestId, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
