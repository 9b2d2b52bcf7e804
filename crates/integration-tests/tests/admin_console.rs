//! Admin console workflows, over HTTP.

#![allow(clippy::unwrap_used)]

use harbor_core::{Dataset, OrderStatus};
use harbor_integration_tests::{browser, sign_in_admin, spawn_admin};
use reqwest::StatusCode;

#[tokio::test]
async fn console_requires_sign_in() {
    let admin = spawn_admin().await;
    let client = browser();

    let response = client.get(admin.url("/orders")).send().await.unwrap();
    assert_eq!(response.url().path(), "/auth/login");

    let refused = client
        .post(admin.url("/auth/login"))
        .form(&[("email", "ana@example.com")])
        .send()
        .await
        .unwrap();
    let body = refused.text().await.unwrap();
    assert!(body.contains("No admin account uses that email address."));
}

#[tokio::test]
async fn settings_changes_are_saved() {
    let admin = spawn_admin().await;
    let client = browser();
    sign_in_admin(&client, &admin).await;

    let saved = client
        .post(admin.url("/settings"))
        .form(&[
            ("store_name", "Pine Street Supply"),
            ("support_email", "help@pinestreet.test"),
            ("currency", "USD"),
            ("tax_rate_percent", "7.5"),
            ("standard_shipping_rate", "4.99"),
            ("express_shipping_rate", "12.99"),
            ("free_shipping_threshold", "100"),
            ("low_stock_threshold", "3"),
            ("products_per_page", "24"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(saved.status(), StatusCode::OK);
    assert!(saved.text().await.unwrap().contains("Settings saved."));

    let page = client.get(admin.url("/settings")).send().await.unwrap();
    let body = page.text().await.unwrap();
    assert!(body.contains("Pine Street Supply"));
    assert!(body.contains("help@pinestreet.test"));
}

#[tokio::test]
async fn order_status_follows_the_lifecycle() {
    let admin = spawn_admin().await;
    let client = browser();
    sign_in_admin(&client, &admin).await;

    let seed = Dataset::seed().unwrap();
    let pending = seed
        .orders
        .iter()
        .find(|o| o.status == OrderStatus::Pending)
        .unwrap();
    let path = format!("/orders/{}", pending.id);

    let processing = client
        .post(admin.url(&format!("{path}/status")))
        .form(&[("status", "processing")])
        .send()
        .await
        .unwrap();
    assert_eq!(processing.url().path(), path);
    let body = processing.text().await.unwrap();
    assert!(
        body.contains(&format!("{} is now Processing.", pending.number)),
        "{body}"
    );

    // Processing orders cannot be marked delivered without shipping first.
    let skipped = client
        .post(admin.url(&format!("{path}/status")))
        .form(&[("status", "delivered")])
        .send()
        .await
        .unwrap();
    assert!(skipped.text().await.unwrap().contains("Status not changed"));

    let shipped = client
        .post(admin.url(&format!("{path}/status")))
        .form(&[("status", "shipped")])
        .send()
        .await
        .unwrap();
    let body = shipped.text().await.unwrap();
    assert!(body.contains("marked as shipped. Tracking number 1ZHP"), "{body}");
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let admin = spawn_admin().await;
    let client = browser();
    sign_in_admin(&client, &admin).await;

    let response = client.get(admin.url("/orders/9999")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
