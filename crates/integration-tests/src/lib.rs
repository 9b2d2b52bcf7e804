//! Integration tests for Harbor & Pine.
//!
//! Each test starts the storefront and/or admin in-process on an ephemeral
//! `127.0.0.1` port, with its own freshly seeded dataset, and drives it over
//! real HTTP with a cookie-keeping `reqwest` client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p harbor-integration-tests
//! ```

use std::net::SocketAddr;

use reqwest::Client;
use tokio::net::TcpListener;

/// The seeded admin account.
pub const ADMIN_EMAIL: &str = "admin@harborandpine.test";

/// A server running in the background of the current test.
pub struct TestServer {
    pub base_url: String,
}

impl TestServer {
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");
    (listener, format!("http://{addr}"))
}

/// Start a storefront over the embedded seed.
pub async fn spawn_storefront() -> TestServer {
    use harbor_storefront::config::StorefrontConfig;
    use harbor_storefront::content::ContentStore;
    use harbor_storefront::db::Store;
    use harbor_storefront::state::AppState;

    let (listener, base_url) = bind().await;
    let state = AppState::with_parts(
        StorefrontConfig::default(),
        Store::load(None).expect("Seed dataset loads"),
        ContentStore::default(),
    );
    state.start_search_indexing();
    let app = harbor_storefront::app(state);

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Storefront test server failed");
    });
    TestServer { base_url }
}

/// Start an admin console over the embedded seed.
pub async fn spawn_admin() -> TestServer {
    use harbor_admin::config::AdminConfig;
    use harbor_admin::db::Store;
    use harbor_admin::state::AppState;

    let (listener, base_url) = bind().await;
    let state = AppState::with_parts(
        AdminConfig::default(),
        Store::new(harbor_core::Dataset::seed().expect("Seed dataset loads")),
    );
    let app = harbor_admin::app(state);

    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("Admin test server failed");
    });
    TestServer { base_url }
}

/// A client that keeps cookies and follows redirects, like a browser.
#[must_use]
pub fn browser() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Sign in to `admin` as the seeded admin account.
pub async fn sign_in_admin(client: &Client, admin: &TestServer) {
    let response = client
        .post(admin.url("/auth/login"))
        .form(&[("email", ADMIN_EMAIL)])
        .send()
        .await
        .expect("Sign-in request failed");
    assert!(
        response.status().is_success(),
        "admin sign-in failed: {}",
        response.status()
    );
    assert_eq!(response.url().path(), "/");
}
