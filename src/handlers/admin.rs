use axum::extract::{Path, State};
use axum::response::Json;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::entities::product;
use crate::errors::ServiceError;
use crate::services::admin::{DashboardStats, UpdateRoleInput, UserRow};
use crate::{ApiResponse, AppState};

#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    responses((status = 200, description = "Store-wide stats", body = ApiResponse<DashboardStats>)),
    security(("bearer" = [])),
    tag = "Admin"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<ApiResponse<DashboardStats>>, ServiceError> {
    Ok(Json(ApiResponse::success(
        state.services.admin.dashboard().await?,
    )))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses((status = 200, description = "All accounts", body = ApiResponse<Vec<UserRow>>)),
    security(("bearer" = [])),
    tag = "Admin"
)]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<ApiResponse<Vec<UserRow>>>, ServiceError> {
    Ok(Json(ApiResponse::success(
        state.services.admin.list_users().await?,
    )))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/role",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateRoleInput,
    responses(
        (status = 200, description = "Role updated", body = ApiResponse<UserRow>),
        (status = 403, description = "Bootstrap admin is protected", body = crate::errors::ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "Admin"
)]
pub async fn update_role(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateRoleInput>,
) -> Result<Json<ApiResponse<UserRow>>, ServiceError> {
    Ok(Json(ApiResponse::success(
        state.services.admin.update_role(id, input).await?,
    )))
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 403, description = "Bootstrap admin is protected", body = crate::errors::ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "Admin"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.services.admin.delete_user(id).await?;
    Ok(Json(ApiResponse::success(())))
}

#[utoipa::path(
    put,
    path = "/api/admin/products/{id}/featured",
    params(("id" = Uuid, Path, description = "Product id")),
    responses((status = 200, description = "Featured flag flipped", body = ApiResponse<product::Model>)),
    security(("bearer" = [])),
    tag = "Admin"
)]
pub async fn toggle_featured(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<product::Model>>, ServiceError> {
    Ok(Json(ApiResponse::success(
        state.services.admin.toggle_featured(id).await?,
    )))
}

#[utoipa::path(
    put,
    path = "/api/admin/products/{id}/new",
    params(("id" = Uuid, Path, description = "Product id")),
    responses((status = 200, description = "New-arrival flag flipped", body = ApiResponse<product::Model>)),
    security(("bearer" = [])),
    tag = "Admin"
)]
pub async fn toggle_new(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<product::Model>>, ServiceError> {
    Ok(Json(ApiResponse::success(
        state.services.admin.toggle_new(id).await?,
    )))
}
