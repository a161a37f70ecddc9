use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use storefront_api::auth::user;
use storefront_api::config::AppConfig;
use storefront_api::{app_router, db, events, migrator, AppState};

/// Spins up the full router against a fresh in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Builds the app after letting the caller tweak the configuration, e.g.
    /// to point the payment client at a wiremock server.
    pub async fn with_config(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "test_secret_key_for_testing_purposes_only".to_string(),
            "sk_test_storefront".to_string(),
        );
        // A single connection keeps every query on the same in-memory db.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        tweak(&mut cfg);

        let pool = db::establish_connection(&cfg)
            .await
            .expect("failed to open test database");
        migrator::run_migrations(&pool)
            .await
            .expect("failed to run migrations");
        let pool = Arc::new(pool);

        let (event_sender, event_rx) = events::event_channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(pool, cfg, event_sender);
        state
            .auth
            .bootstrap_admin(&state.config)
            .await
            .expect("admin bootstrap");

        Self {
            router: app_router(state.clone()),
            state,
            _event_task: event_task,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let response = self.raw_request(method, uri, body, token, &[]).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn raw_request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
        headers: &[(&str, &str)],
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&json).expect("serialize request body"))
            }
            None => Body::empty(),
        };
        self.router
            .clone()
            .oneshot(builder.body(body).expect("build request"))
            .await
            .expect("router error")
    }

    /// Posts a raw (non-JSON-helper) body, used by the webhook tests.
    pub async fn post_raw(
        &self,
        uri: &str,
        body: Vec<u8>,
        headers: &[(&str, &str)],
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(Method::POST).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.router
            .clone()
            .oneshot(builder.body(Body::from(body)).expect("build request"))
            .await
            .expect("router error")
    }

    /// Registers an account through the API and returns its bearer token.
    pub async fn register_user(&self, name: &str, email: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/register",
                Some(json!({
                    "name": name,
                    "email": email,
                    "password": "hunter2hunter2",
                })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["data"]["token"].as_str().expect("token").to_string()
    }

    /// Registers an account, promotes it to admin directly in the database,
    /// and returns a token carrying the admin role.
    pub async fn register_admin(&self, email: &str) -> String {
        self.register_user("Admin", email).await;
        let found = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.state.db)
            .await
            .expect("query user")
            .expect("user exists");
        let mut active: user::ActiveModel = found.into();
        active.role = Set("admin".to_string());
        let promoted = active.update(&*self.state.db).await.expect("promote");
        self.state.auth.issue_token(&promoted).expect("token")
    }

    pub async fn seed_category(&self, name: &str) -> Uuid {
        use storefront_api::entities::category;
        let created = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(None),
            image: Set(None),
            created_at: Set(chrono::Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed category");
        created.id
    }

    pub async fn seed_product(
        &self,
        category_id: Uuid,
        name: &str,
        price: rust_decimal::Decimal,
        stock: i32,
    ) -> Uuid {
        use storefront_api::entities::product;
        let created = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            slug: Set(format!("{}-{}", name.to_lowercase(), Uuid::new_v4().simple())),
            description: Set(String::new()),
            category_id: Set(category_id),
            price: Set(price),
            discount: Set(0),
            stock: Set(stock),
            images: Set(json!(["https://img.example/p.png"])),
            specifications: Set(None),
            featured: Set(false),
            is_new: Set(false),
            average_rating: Set(rust_decimal::Decimal::ZERO),
            num_reviews: Set(0),
            created_at: Set(chrono::Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed product");
        created.id
    }
}

/// Reads a money field regardless of whether the backend serialized it as a
/// JSON string or a number.
pub fn money(value: &Value) -> f64 {
    match value {
        Value::String(s) => s.parse().expect("numeric string"),
        Value::Number(n) => n.as_f64().expect("f64"),
        other => panic!("not a money value: {other}"),
    }
}

/// Shorthand for the standard 100 + 10 + 15 checkout body over two units of a
/// 50.00 product.
pub fn standard_order_body(product_id: Uuid) -> Value {
    json!({
        "items": [{ "product_id": product_id, "quantity": 2 }],
        "shipping_address": {
            "address": "1 Main St",
            "city": "Springfield",
            "postal_code": "12345",
            "country": "US",
        },
        "payment_method": "card",
        "items_price": "100.00",
        "tax_price": "10.00",
        "shipping_price": "15.00",
        "total_price": "125.00",
    })
}
