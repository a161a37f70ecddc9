pub mod auth;
pub mod cart;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post, put};
use axum::Router;
use serde::Serialize;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::ToSchema;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::AppServices;

/// Success envelope; errors use [`errors::ErrorBody`].
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthService>,
    pub services: AppServices,
    pub event_sender: EventSender,
}

impl AppState {
    pub fn new(db: Arc<DbPool>, config: AppConfig, event_sender: EventSender) -> Self {
        let auth = Arc::new(AuthService::new(
            db.clone(),
            config.jwt_secret.clone(),
            config.jwt_expiration as i64,
        ));
        let services = AppServices::new(db.clone(), &config, event_sender.clone());
        Self {
            db,
            config: Arc::new(config),
            auth,
            services,
            event_sender,
        }
    }
}

/// Builds the full application router, middleware included.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .merge(api_routes())
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/status", get(handlers::status))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route(
            "/api/auth/me",
            get(handlers::auth::me).put(handlers::auth::update_me),
        )
        .route(
            "/api/products",
            get(handlers::products::list).post(handlers::products::create),
        )
        .route("/api/products/featured", get(handlers::products::featured))
        .route("/api/products/new", get(handlers::products::new_arrivals))
        .route("/api/products/sale", get(handlers::products::on_sale))
        .route(
            "/api/products/bestsellers",
            get(handlers::products::bestsellers),
        )
        .route(
            "/api/products/:id",
            get(handlers::products::get)
                .put(handlers::products::update)
                .delete(handlers::products::remove),
        )
        .route(
            "/api/products/:id/reviews",
            post(handlers::products::add_review),
        )
        .route(
            "/api/categories",
            get(handlers::categories::list).post(handlers::categories::create),
        )
        .route(
            "/api/categories/:id",
            get(handlers::categories::get)
                .put(handlers::categories::update)
                .delete(handlers::categories::remove),
        )
        .route(
            "/api/orders",
            get(handlers::orders::list_all).post(handlers::orders::create),
        )
        .route("/api/orders/myorders", get(handlers::orders::list_mine))
        .route("/api/orders/:id", get(handlers::orders::get))
        .route("/api/orders/:id/status", put(handlers::orders::update_status))
        .route(
            "/api/payment/create-payment-intent",
            post(handlers::payments::create_intent),
        )
        .route(
            "/api/payment/payment-success",
            post(handlers::payments::payment_success),
        )
        .route(
            "/api/payment/webhook",
            post(handlers::payment_webhooks::payment_webhook),
        )
        .route("/api/admin/dashboard", get(handlers::admin::dashboard))
        .route("/api/admin/users", get(handlers::admin::list_users))
        .route(
            "/api/admin/users/:id/role",
            put(handlers::admin::update_role),
        )
        .route("/api/admin/users/:id", delete(handlers::admin::delete_user))
        .route(
            "/api/admin/products/:id/featured",
            put(handlers::admin::toggle_featured),
        )
        .route(
            "/api/admin/products/:id/new",
            put(handlers::admin::toggle_new),
        )
}
