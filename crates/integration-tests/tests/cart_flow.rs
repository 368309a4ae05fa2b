//! Cart routes exercised over one browser session.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::http::StatusCode;
use partsyard_integration_tests::{
    BRAKE_PADS, HEADLIGHT, MISSING_PART, OIL_FILTER, TestApp, part,
};
use serde_json::json;

#[tokio::test]
async fn test_health_is_public() {
    let mut app = TestApp::new();
    let response = app.get("/health").await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_new_session_has_empty_cart() {
    let mut app = TestApp::new();
    assert_eq!(app.cart_count().await, 0);

    let cart = app.get("/cart").await.json();
    assert_eq!(cart["items"], json!([]));
    assert_eq!(cart["unique_count"], 0);
    assert_eq!(cart["total_price"], "0");
}

#[tokio::test]
async fn test_add_accumulates_across_requests() {
    let mut app = TestApp::new();

    let response = app.add_to_cart(BRAKE_PADS, 2).await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Brake pad set added to cart");
    assert_eq!(body["total_quantity"], 2);

    app.add_to_cart(BRAKE_PADS, 1).await;
    app.add_to_cart(OIL_FILTER, 1).await;

    assert_eq!(app.cart_count().await, 4);
    let cart = app.get("/cart").await.json();
    assert_eq!(cart["unique_count"], 2);
    assert_eq!(cart["total_quantity"], 4);
    assert_eq!(cart["total_price"], "35.00");
}

#[tokio::test]
async fn test_override_sets_quantity() {
    let mut app = TestApp::new();
    app.add_to_cart(OIL_FILTER, 5).await;

    let response = app
        .post_json(
            &format!("/cart/add/{OIL_FILTER}"),
            &json!({ "quantity": 2, "override": true }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["total_quantity"], 2);
}

#[tokio::test]
async fn test_missing_quantity_defaults_to_one() {
    let mut app = TestApp::new();
    let response = app
        .post_json(&format!("/cart/add/{BRAKE_PADS}"), &json!({}))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.cart_count().await, 1);
}

#[tokio::test]
async fn test_out_of_range_quantity_is_rejected() {
    let mut app = TestApp::new();

    let response = app.add_to_cart(BRAKE_PADS, 0).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let body = response.json();
    assert_eq!(body["success"], false);
    assert!(body["errors"]["quantity"].is_array());

    let response = app.add_to_cart(BRAKE_PADS, 100).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    assert_eq!(app.cart_count().await, 0);
}

#[tokio::test]
async fn test_form_post_redirects_to_cart() {
    let mut app = TestApp::new();

    let response = app
        .post_form(&format!("/cart/add/{BRAKE_PADS}"), "quantity=3")
        .await;
    assert!(response.status.is_redirection());
    assert_eq!(response.location(), Some("/cart"));

    // Invalid quantity from a plain form: back to the cart, nothing added.
    let response = app
        .post_form(&format!("/cart/add/{OIL_FILTER}"), "quantity=0")
        .await;
    assert!(response.status.is_redirection());

    assert_eq!(app.cart_count().await, 3);
}

#[tokio::test]
async fn test_unknown_and_inactive_parts_are_not_found() {
    let mut app = TestApp::new();

    let response = app.add_to_cart(MISSING_PART, 1).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.add_to_cart(HEADLIGHT, 1).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    assert_eq!(app.cart_count().await, 0);
}

#[tokio::test]
async fn test_remove_line() {
    let mut app = TestApp::new();
    app.add_to_cart(BRAKE_PADS, 2).await;
    app.add_to_cart(OIL_FILTER, 1).await;

    let response = app
        .post_json(&format!("/cart/remove/{BRAKE_PADS}"), &json!({}))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["total_quantity"], 1);

    // Removing something that is not in the cart changes nothing.
    let response = app
        .post_json(&format!("/cart/remove/{MISSING_PART}"), &json!({}))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.cart_count().await, 1);
}

#[tokio::test]
async fn test_price_is_snapshotted_on_first_add() {
    let mut app = TestApp::new();
    app.add_to_cart(BRAKE_PADS, 1).await;

    app.catalog
        .upsert(part(BRAKE_PADS, "Brake pad set", "12.00", true))
        .await;
    app.add_to_cart(BRAKE_PADS, 1).await;

    let cart = app.get("/cart").await.json();
    assert_eq!(cart["total_price"], "20.00");
    assert_eq!(cart["items"][0]["price"], "10.00");
    assert_eq!(cart["items"][0]["part"]["price"], "12.00");
}

#[tokio::test]
async fn test_part_removed_from_catalog_stays_in_cart() {
    let mut app = TestApp::new();
    app.add_to_cart(OIL_FILTER, 2).await;
    app.catalog.remove(OIL_FILTER).await;

    let cart = app.get("/cart").await.json();
    assert_eq!(cart["total_quantity"], 2);
    assert_eq!(cart["items"][0]["part"], json!(null));
    assert_eq!(cart["items"][0]["title"], "Oil filter");
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let mut app = TestApp::new();
    app.add_to_cart(BRAKE_PADS, 2).await;

    let mut other = app.new_client();
    assert_eq!(other.cart_count().await, 0);
    assert_eq!(app.cart_count().await, 2);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let mut app = TestApp::new();
    let request = axum::http::Request::get("/health")
        .header("x-request-id", "trace-abc-123")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("x-request-id"), Some("trace-abc-123"));

    let response = app.get("/health").await;
    let generated = response.header("x-request-id").unwrap();
    assert_eq!(generated.len(), 36);
}
