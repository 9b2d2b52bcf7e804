//! Harbor & Pine admin library.
//!
//! This crate provides the admin console as a library, allowing it to be
//! tested and reused. The binary in `main.rs` only sets up logging, error
//! tracking and TLS around [`app`].
//!
//! # Security
//!
//! Every page except sign-in and the health checks requires an admin
//! session. Sign-in is simulated: any account with the admin role may sign
//! in by email. Run the console on a private network only.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod components;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod views;

use axum::{
    Router,
    extract::State,
    http::{Request, Response, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::error::AppError;
use crate::state::AppState;

/// Build the admin router with all middleware applied.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.config());
    let static_dir = ServeDir::new(&state.config().static_dir);

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .nest_service("/static", static_dir)
        .fallback(not_found)
        .layer(session_layer)
        .layer(from_fn_with_state(
            state.clone(),
            middleware::security_headers_middleware,
        ))
        .layer(from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &Response<_>, latency: std::time::Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if edits have left the dataset with
/// dangling references.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    let problems = state.store().read().await.integrity_errors();
    if problems.is_empty() {
        StatusCode::OK
    } else {
        tracing::warn!(?problems, "Dataset integrity check failed");
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn not_found() -> AppError {
    AppError::NotFound("page".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{HeaderValue, Request, StatusCode, header};
    use harbor_core::Dataset;
    use tower::ServiceExt;

    use super::*;
    use crate::config::AdminConfig;
    use crate::db::Store;

    fn test_app() -> Router {
        let state = AppState::with_parts(
            AdminConfig::default(),
            Store::new(Dataset::seed().unwrap()),
        );
        app(state)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_form(uri: &str, body: &str, cookie: Option<&HeaderValue>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    /// Sign in as the seeded admin and return the session cookie.
    async fn sign_in(app: &Router) -> HeaderValue {
        let response = app
            .clone()
            .oneshot(post_form(
                "/auth/login",
                "email=admin%40harborandpine.test",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        let pair = set_cookie.split(';').next().unwrap();
        HeaderValue::from_str(pair).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_app().oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_ready_with_seed() {
        let response = test_app().oneshot(get("/health/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let response = test_app().oneshot(get("/no/such/page")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_pages_require_sign_in() {
        for uri in ["/", "/products", "/orders/1", "/customers", "/coupons", "/settings"] {
            let response = test_app().oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
            assert_eq!(response.headers()[header::LOCATION], "/auth/login");
        }
    }

    #[tokio::test]
    async fn test_customer_email_cannot_sign_in() {
        let response = test_app()
            .oneshot(post_form("/auth/login", "email=ana%40example.com", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_signed_in_pages_render() {
        let app = test_app();
        let cookie = sign_in(&app).await;
        for uri in [
            "/",
            "/products?sort=-price",
            "/products/new",
            "/products/1/edit",
            "/orders?status=pending",
            "/orders/1",
            "/customers?q=ana",
            "/customers/2",
            "/coupons",
            "/coupons/new",
            "/coupons/1/edit",
            "/settings",
        ] {
            let request = Request::builder()
                .uri(uri)
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_product_toggle_returns_to_current_view() {
        let app = test_app();
        let cookie = sign_in(&app).await;
        let request = Request::builder()
            .uri("/products?sort=-price")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains("/status?return_to=/products%3F"), "{body}");
        assert!(body.contains("sort%3D-price"), "{body}");
    }

    #[tokio::test]
    async fn test_invalid_settings_are_rejected() {
        let app = test_app();
        let cookie = sign_in(&app).await;
        let response = app
            .clone()
            .oneshot(post_form(
                "/settings",
                "store_name=&support_email=nope&currency=XYZ",
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_unknown_order_is_404_when_signed_in() {
        let app = test_app();
        let cookie = sign_in(&app).await;
        let request = Request::builder()
            .uri("/orders/9999")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
