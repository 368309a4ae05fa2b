//! Staff order management and customer order history.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::http::StatusCode;
use partsyard_core::{OrderId, OrderStatus};
use partsyard_integration_tests::{BRAKE_PADS, OIL_FILTER, TestApp, customer, staff_user};
use partsyard_storefront::db::OrderStore;
use serde_json::json;

/// Place one order from a fresh session and return its ID.
async fn place_order(app: &TestApp, email: &str) -> i64 {
    let mut buyer = app.new_client();
    buyer.add_to_cart(BRAKE_PADS, 1).await;
    buyer.add_to_cart(OIL_FILTER, 2).await;
    let response = buyer.checkout(email).await;
    assert_eq!(response.status, StatusCode::OK);
    response.json()["order_id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_order_list_requires_staff() {
    let mut app = TestApp::new();
    place_order(&app, "buyer@example.com").await;

    assert_eq!(app.get("/orders").await.status, StatusCode::UNAUTHORIZED);

    app.sign_in(&customer(5, "buyer@example.com")).await;
    assert_eq!(app.get("/orders").await.status, StatusCode::FORBIDDEN);

    let mut staff = app.new_client();
    staff.sign_in(&staff_user()).await;
    let response = staff.get("/orders").await;
    assert_eq!(response.status, StatusCode::OK);
    let orders = response.json();
    assert_eq!(orders.as_array().unwrap().len(), 1);
    assert_eq!(orders[0]["total_quantity"], 3);
    assert_eq!(orders[0]["total_price"], "20.00");
}

#[tokio::test]
async fn test_orders_listed_newest_first() {
    let mut app = TestApp::new();
    let first = place_order(&app, "one@example.com").await;
    let second = place_order(&app, "two@example.com").await;

    app.sign_in(&staff_user()).await;
    let orders = app.get("/orders").await.json();
    assert_eq!(orders[0]["id"], second);
    assert_eq!(orders[1]["id"], first);
}

#[tokio::test]
async fn test_staff_updates_status() {
    let mut app = TestApp::new();
    let id = place_order(&app, "buyer@example.com").await;
    app.sign_in(&staff_user()).await;

    let response = app
        .post_json(&format!("/orders/update_status/{id}"), &json!({ "status": "SHP" }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "SHP");
    assert_eq!(body["is_paid"], false);

    // Moving backwards is allowed.
    let response = app
        .post_form(&format!("/orders/update_status/{id}"), "status=PRC")
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let id = OrderId::new(i32::try_from(id).unwrap());
    let order = app.orders.get(id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Processing);
}

#[tokio::test]
async fn test_unknown_status_code_is_rejected() {
    let mut app = TestApp::new();
    let id = place_order(&app, "buyer@example.com").await;
    app.sign_in(&staff_user()).await;

    let response = app
        .post_json(&format!("/orders/update_status/{id}"), &json!({ "status": "XYZ" }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_missing_order_is_not_found() {
    let mut app = TestApp::new();
    app.sign_in(&staff_user()).await;

    let response = app
        .post_json("/orders/update_status/4242", &json!({ "status": "CMP" }))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app
        .post_json("/orders/update_paid_status/4242", &json!({ "is_paid": true }))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_staff_sets_paid_flag() {
    let mut app = TestApp::new();
    let id = place_order(&app, "buyer@example.com").await;
    app.sign_in(&staff_user()).await;

    let response = app
        .post_form(&format!("/orders/update_paid_status/{id}"), "is_paid=on")
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["is_paid"], true);
    assert_eq!(body["status"], "NEW");

    // An unchecked checkbox sends nothing.
    let response = app
        .post_form(&format!("/orders/update_paid_status/{id}"), "")
        .await;
    assert_eq!(response.json()["is_paid"], false);
}

#[tokio::test]
async fn test_status_updates_require_staff() {
    let mut app = TestApp::new();
    let id = place_order(&app, "buyer@example.com").await;

    let response = app
        .post_json(&format!("/orders/update_status/{id}"), &json!({ "status": "CNC" }))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    app.sign_in(&customer(5, "buyer@example.com")).await;
    let response = app
        .post_json(&format!("/orders/update_paid_status/{id}"), &json!({ "is_paid": true }))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_staff_can_view_any_confirmation() {
    let mut app = TestApp::new();
    let id = place_order(&app, "buyer@example.com").await;

    let path = format!("/orders/success/{id}");
    assert_eq!(app.get(&path).await.status, StatusCode::NOT_FOUND);

    app.sign_in(&staff_user()).await;
    assert_eq!(app.get(&path).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_account_history_matches_email() {
    let mut app = TestApp::new();
    let mine = place_order(&app, "Buyer@Example.com").await;
    place_order(&app, "someone.else@example.com").await;

    assert_eq!(
        app.get("/account/orders").await.status,
        StatusCode::UNAUTHORIZED
    );

    app.sign_in(&customer(5, "buyer@example.com")).await;
    let orders = app.get("/account/orders").await.json();
    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["id"], mine);

    let mut staff = app.new_client();
    staff.sign_in(&staff_user()).await;
    let all = staff.get("/account/orders").await.json();
    assert_eq!(all.as_array().unwrap().len(), 2);
}
