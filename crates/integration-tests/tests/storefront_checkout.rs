//! Guest checkout from cart to order tracking, over HTTP.

#![allow(clippy::unwrap_used)]

use harbor_integration_tests::{browser, spawn_storefront};
use reqwest::StatusCode;

const SHIPPING: &[(&str, &str)] = &[
    ("email", "guest.shopper@example.com"),
    ("first_name", "Mara"),
    ("last_name", "Lindqvist"),
    ("line1", "9 Wharf Lane"),
    ("line2", ""),
    ("city", "Bar Harbor"),
    ("region", "ME"),
    ("postal_code", "04609"),
    ("country", "United States"),
    ("phone", ""),
    ("shipping_method", "standard"),
];

const PAYMENT: &[(&str, &str)] = &[
    ("cardholder", "Mara Lindqvist"),
    ("card_number", "4242 4242 4242 4242"),
    ("expiry", "12/40"),
    ("cvc", "123"),
];

#[tokio::test]
async fn guest_checkout_places_a_trackable_order() {
    let store = spawn_storefront().await;
    let client = browser();

    let home = client.get(store.url("/")).send().await.unwrap();
    assert_eq!(home.status(), StatusCode::OK);

    let cart = client
        .post(store.url("/cart/add"))
        .form(&[("variant_id", "101"), ("quantity", "2")])
        .send()
        .await
        .unwrap();
    assert_eq!(cart.status(), StatusCode::OK);
    assert_eq!(cart.url().path(), "/cart");

    let cart = client
        .post(store.url("/cart/coupon"))
        .form(&[("code", "welcome10")])
        .send()
        .await
        .unwrap();
    let body = cart.text().await.unwrap();
    assert!(body.contains("Coupon WELCOME10 applied."), "{body}");

    let payment_page = client
        .post(store.url("/checkout/shipping"))
        .form(SHIPPING)
        .send()
        .await
        .unwrap();
    assert_eq!(payment_page.url().path(), "/checkout/payment");

    let review = client
        .post(store.url("/checkout/payment"))
        .form(PAYMENT)
        .send()
        .await
        .unwrap();
    assert_eq!(review.url().path(), "/checkout/review");
    let body = review.text().await.unwrap();
    assert!(body.contains("4242"));
    assert!(!body.contains("4242 4242 4242 4242"));
    assert!(body.contains("$105.84"), "{body}");

    let confirmation = client
        .post(store.url("/checkout/place"))
        .send()
        .await
        .unwrap();
    assert_eq!(confirmation.status(), StatusCode::OK);
    let number = confirmation
        .url()
        .path()
        .strip_prefix("/checkout/confirmation/")
        .unwrap()
        .to_string();
    assert!(number.starts_with("HP-"));
    let body = confirmation.text().await.unwrap();
    assert!(body.contains(&number));

    // The cart is empty once the order is placed.
    let count = client.get(store.url("/cart/count")).send().await.unwrap();
    assert!(count.text().await.unwrap().contains(">0<"));

    // A different visitor needs the order number and the matching email.
    let stranger = browser();
    let hidden = stranger
        .get(store.url(&format!("/orders/{number}")))
        .send()
        .await
        .unwrap();
    assert_eq!(hidden.url().path(), "/orders/track");

    let missed = stranger
        .post(store.url("/orders/track"))
        .form(&[("number", number.as_str()), ("email", "someone@example.com")])
        .send()
        .await
        .unwrap();
    assert_eq!(missed.status(), StatusCode::NOT_FOUND);

    let tracked = stranger
        .post(store.url("/orders/track"))
        .form(&[
            ("number", number.to_lowercase().as_str()),
            ("email", "Guest.Shopper@example.com"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(tracked.status(), StatusCode::OK);
    assert_eq!(tracked.url().path(), format!("/orders/{number}"));
}

#[tokio::test]
async fn checkout_with_an_empty_cart_goes_back_to_the_cart() {
    let store = spawn_storefront().await;
    let client = browser();

    let response = client
        .get(store.url("/checkout/shipping"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.url().path(), "/cart");
}

#[tokio::test]
async fn payment_cannot_be_skipped_to() {
    let store = spawn_storefront().await;
    let client = browser();

    client
        .post(store.url("/cart/add"))
        .form(&[("variant_id", "101"), ("quantity", "1")])
        .send()
        .await
        .unwrap();

    let response = client
        .get(store.url("/checkout/review"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.url().path(), "/checkout/shipping");
}
