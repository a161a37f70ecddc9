pub mod admin;
pub mod auth;
pub mod categories;
pub mod orders;
pub mod payment_webhooks;
pub mod payments;
pub mod products;

use axum::response::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::ApiResponse;

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusInfo {
    pub name: &'static str,
    pub version: &'static str,
}

#[utoipa::path(get, path = "/api/health", responses((status = 200, description = "Service is up")), tag = "Health")]
pub async fn health() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("ok"))
}

#[utoipa::path(get, path = "/api/status", responses((status = 200, description = "Build info", body = ApiResponse<StatusInfo>)), tag = "Health")]
pub async fn status() -> Json<ApiResponse<StatusInfo>> {
    Json(ApiResponse::success(StatusInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    }))
}
