mod common;

use axum::http::{Method, StatusCode};
use common::{standard_order_body, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

use storefront_api::services::stripe::sign_payload;

const WEBHOOK_SECRET: &str = "whsec_integration_test";

async fn app_with_webhooks() -> TestApp {
    TestApp::with_config(|cfg| {
        cfg.stripe_webhook_secret = Some(WEBHOOK_SECRET.to_string());
    })
    .await
}

async fn create_order(app: &TestApp) -> (String, String) {
    let token = app.register_user("Alice", "alice@example.com").await;
    let category = app.seed_category("Peripherals").await;
    let product = app.seed_product(category, "Keyboard", dec!(50.00), 10).await;
    let (_, created) = app
        .request(
            Method::POST,
            "/api/orders",
            Some(standard_order_body(product)),
            Some(&token),
        )
        .await;
    (
        created["data"]["id"].as_str().unwrap().to_string(),
        token,
    )
}

fn succeeded_event(order_id: &str, intent_id: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": format!("evt_{intent_id}"),
        "type": "payment_intent.succeeded",
        "data": { "object": {
            "id": intent_id,
            "receipt_email": "alice@example.com",
            "metadata": { "order_id": order_id, "user_id": "ignored" },
        }}
    }))
    .unwrap()
}

async fn deliver(app: &TestApp, payload: Vec<u8>, secret: &str) -> StatusCode {
    let signature = sign_payload(&payload, secret, chrono::Utc::now().timestamp());
    app.post_raw(
        "/api/payment/webhook",
        payload,
        &[("Stripe-Signature", signature.as_str())],
    )
    .await
    .status()
}

async fn fetch_order(app: &TestApp, order_id: &str, token: &str) -> serde_json::Value {
    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/orders/{order_id}"),
            None,
            Some(token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    body["data"].clone()
}

#[tokio::test]
async fn signed_succeeded_event_marks_the_order_paid() {
    let app = app_with_webhooks().await;
    let (order_id, token) = create_order(&app).await;

    let status = deliver(&app, succeeded_event(&order_id, "pi_hook_1"), WEBHOOK_SECRET).await;
    assert_eq!(status, StatusCode::OK);

    let order = fetch_order(&app, &order_id, &token).await;
    assert_eq!(order["is_paid"], true);
    assert_eq!(order["status"], "processing");
    assert_eq!(order["payment_result"]["id"], "pi_hook_1");
}

#[tokio::test]
async fn invalid_signature_is_rejected_without_any_write() {
    let app = app_with_webhooks().await;
    let (order_id, token) = create_order(&app).await;

    let status = deliver(&app, succeeded_event(&order_id, "pi_forged"), "whsec_wrong").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let order = fetch_order(&app, &order_id, &token).await;
    assert_eq!(order["is_paid"], false);
    assert_eq!(order["status"], "pending");
}

#[tokio::test]
async fn duplicate_delivery_keeps_the_first_result() {
    let app = app_with_webhooks().await;
    let (order_id, token) = create_order(&app).await;

    assert_eq!(
        deliver(&app, succeeded_event(&order_id, "pi_first"), WEBHOOK_SECRET).await,
        StatusCode::OK
    );
    let first = fetch_order(&app, &order_id, &token).await;

    assert_eq!(
        deliver(&app, succeeded_event(&order_id, "pi_second"), WEBHOOK_SECRET).await,
        StatusCode::OK
    );
    let second = fetch_order(&app, &order_id, &token).await;

    assert_eq!(second["paid_at"], first["paid_at"]);
    assert_eq!(second["payment_result"]["id"], "pi_first");
}

#[tokio::test]
async fn payment_failed_event_leaves_the_order_pending() {
    let app = app_with_webhooks().await;
    let (order_id, token) = create_order(&app).await;

    let payload = serde_json::to_vec(&json!({
        "id": "evt_fail",
        "type": "payment_intent.payment_failed",
        "data": { "object": {
            "id": "pi_fail",
            "metadata": { "order_id": order_id },
        }}
    }))
    .unwrap();
    assert_eq!(deliver(&app, payload, WEBHOOK_SECRET).await, StatusCode::OK);

    let order = fetch_order(&app, &order_id, &token).await;
    assert_eq!(order["is_paid"], false);
    assert_eq!(order["status"], "pending");
}

#[tokio::test]
async fn unrelated_event_types_are_acknowledged() {
    let app = app_with_webhooks().await;

    let payload = serde_json::to_vec(&json!({
        "id": "evt_other",
        "type": "charge.refunded",
        "data": { "object": {} }
    }))
    .unwrap();
    assert_eq!(deliver(&app, payload, WEBHOOK_SECRET).await, StatusCode::OK);
}

#[tokio::test]
async fn succeeded_event_for_an_unknown_order_is_acknowledged() {
    let app = app_with_webhooks().await;

    let payload = succeeded_event(&uuid::Uuid::new_v4().to_string(), "pi_ghost");
    assert_eq!(deliver(&app, payload, WEBHOOK_SECRET).await, StatusCode::OK);
}

#[tokio::test]
async fn browser_callback_and_webhook_race_retains_one_result() {
    let app = app_with_webhooks().await;
    let (order_id, token) = create_order(&app).await;

    // Fire the browser-style confirmation and the webhook back to back.
    let (status, _) = app
        .request(
            Method::POST,
            "/api/payment/payment-success",
            Some(json!({ "order_id": order_id, "payment_intent_id": "pi_browser" })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        deliver(&app, succeeded_event(&order_id, "pi_hook"), WEBHOOK_SECRET).await,
        StatusCode::OK
    );

    let order = fetch_order(&app, &order_id, &token).await;
    assert_eq!(order["is_paid"], true);
    assert_eq!(order["status"], "processing");
    assert_eq!(order["payment_result"]["id"], "pi_browser");
}
