//! Security headers middleware (stricter for admin).
//!
//! No page in the console is ever cached or framed, and HSTS is sent when
//! the console is served over HTTPS.

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue, header},
    middleware::Next,
    response::Response,
};

use crate::state::AppState;

/// Stricter CSP - no external scripts, no inline styles.
const CONTENT_SECURITY_POLICY: &str = "default-src 'none'; \
     script-src 'self'; \
     style-src 'self'; \
     img-src 'self' data:; \
     form-action 'self'; \
     base-uri 'none'; \
     frame-ancestors 'none'; \
     object-src 'none'";

const STRICT_TRANSPORT_SECURITY: &str = "max-age=31536000; includeSubDomains";

const HEADERS: [(HeaderName, &str); 7] = [
    (header::CONTENT_SECURITY_POLICY, CONTENT_SECURITY_POLICY),
    (header::X_FRAME_OPTIONS, "DENY"),
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::REFERRER_POLICY, "no-referrer"),
    (header::CACHE_CONTROL, "no-store"),
    (
        HeaderName::from_static("cross-origin-opener-policy"),
        "same-origin",
    ),
    (
        HeaderName::from_static("cross-origin-resource-policy"),
        "same-origin",
    ),
];

/// Add security headers to all responses.
pub async fn security_headers_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    for (name, value) in HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }
    if state.config().is_secure() {
        headers.insert(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static(STRICT_TRANSPORT_SECURITY),
        );
    }

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, middleware, routing::get};
    use harbor_core::Dataset;
    use tower::ServiceExt;

    use super::*;
    use crate::config::AdminConfig;
    use crate::db::Store;

    async fn headers_for(config: AdminConfig) -> axum::http::HeaderMap {
        let state = AppState::with_parts(config, Store::new(Dataset::seed().unwrap()));
        let app = Router::new()
            .route("/", get(|| async { "hi" }))
            .layer(middleware::from_fn_with_state(
                state,
                security_headers_middleware,
            ));
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        response.headers().clone()
    }

    #[tokio::test]
    async fn test_headers_applied() {
        let headers = headers_for(AdminConfig::default()).await;
        assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(headers[header::CACHE_CONTROL], "no-store");
        assert!(headers.get(header::STRICT_TRANSPORT_SECURITY).is_none());
    }

    #[tokio::test]
    async fn test_hsts_over_https() {
        let config = AdminConfig {
            base_url: "https://admin.harborandpine.test".parse().unwrap(),
            ..AdminConfig::default()
        };
        let headers = headers_for(config).await;
        assert!(headers.contains_key(header::STRICT_TRANSPORT_SECURITY));
    }
}
