mod common;

use axum::http::{Method, StatusCode};
use common::{money, standard_order_body, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn register_login_and_profile_round_trip() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/register",
            Some(json!({
                "name": "Alice",
                "email": "alice@example.com",
                "password": "hunter2hunter2",
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["user"]["role"], "user");
    assert!(body["data"]["user"].get("password_hash").is_none());

    // Same email again is rejected.
    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/register",
            Some(json!({
                "name": "Alice Again",
                "email": "alice@example.com",
                "password": "hunter2hunter2",
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "email": "alice@example.com", "password": "wrong-password" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "email": "alice@example.com", "password": "hunter2hunter2" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = app
        .request(Method::GET, "/api/auth/me", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "alice@example.com");

    let (status, body) = app
        .request(
            Method::PUT,
            "/api/auth/me",
            Some(json!({ "name": "Alice B." })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Alice B.");
}

#[tokio::test]
async fn requests_without_a_valid_token_are_unauthorized() {
    let app = TestApp::new().await;

    let (status, _) = app.request(Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(Method::GET, "/api/auth/me", None, Some("not-a-token"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bootstrap_admin_is_created_once_and_protected() {
    let app = TestApp::with_config(|cfg| {
        cfg.admin_email = Some("boss@example.com".to_string());
        cfg.admin_password = Some("extremely-secret-pw".to_string());
    })
    .await;

    // The configured account can log straight in with the admin role.
    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "email": "boss@example.com", "password": "extremely-secret-pw" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["role"], "admin");
    let boss_token = body["data"]["token"].as_str().unwrap().to_string();
    let boss_id = body["data"]["user"]["id"].as_str().unwrap().to_string();

    // Bootstrapping again is a no-op.
    app.state
        .auth
        .bootstrap_admin(&app.state.config)
        .await
        .unwrap();
    let (_, users) = app
        .request(Method::GET, "/api/admin/users", None, Some(&boss_token))
        .await;
    assert_eq!(users["data"].as_array().unwrap().len(), 1);

    // The bootstrap account cannot be demoted or deleted, even by itself.
    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/api/admin/users/{boss_id}/role"),
            Some(json!({ "role": "user" })),
            Some(&boss_token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/admin/users/{boss_id}"),
            None,
            Some(&boss_token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_can_manage_other_accounts() {
    let app = TestApp::new().await;
    let admin = app.register_admin("root@example.com").await;
    app.register_user("Alice", "alice@example.com").await;

    let (_, users) = app
        .request(Method::GET, "/api/admin/users", None, Some(&admin))
        .await;
    let alice = users["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == "alice@example.com")
        .unwrap();
    let alice_id = alice["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/api/admin/users/{alice_id}/role"),
            Some(json!({ "role": "admin" })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "admin");

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/admin/users/{alice_id}"),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, users) = app
        .request(Method::GET, "/api/admin/users", None, Some(&admin))
        .await;
    assert!(users["data"]
        .as_array()
        .unwrap()
        .iter()
        .all(|u| u["email"] != "alice@example.com"));
}

#[tokio::test]
async fn dashboard_reports_counts_and_revenue() {
    let app = TestApp::new().await;
    let admin = app.register_admin("root@example.com").await;
    let alice = app.register_user("Alice", "alice@example.com").await;
    let category = app.seed_category("Audio").await;
    let product = app.seed_product(category, "Speaker", dec!(50.00), 3).await;

    let (_, created) = app
        .request(
            Method::POST,
            "/api/orders",
            Some(standard_order_body(product)),
            Some(&alice),
        )
        .await;
    let order_id = created["data"]["id"].as_str().unwrap().to_string();
    app.request(
        Method::POST,
        "/api/payment/payment-success",
        Some(json!({ "order_id": order_id, "payment_intent_id": "pi_dash" })),
        Some(&alice),
    )
    .await;

    let (status, body) = app
        .request(Method::GET, "/api/admin/dashboard", None, Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let stats = &body["data"];
    assert_eq!(stats["product_count"], 1);
    assert_eq!(stats["order_count"], 1);
    assert_eq!(stats["user_count"], 2);
    assert_eq!(money(&stats["total_revenue"]), 125.0);
    assert_eq!(stats["pending_orders"], 0);
    // Stock fell to 1 with the paid order, below the low-stock threshold.
    assert_eq!(stats["low_stock_products"].as_array().unwrap().len(), 1);
    assert_eq!(stats["recent_orders"].as_array().unwrap().len(), 1);
}
