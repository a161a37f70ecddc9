use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::entities::category;
use crate::errors::ServiceError;
use crate::services::catalog::{CreateCategoryInput, UpdateCategoryInput};
use crate::{ApiResponse, AppState};

#[utoipa::path(
    get,
    path = "/api/categories",
    responses((status = 200, description = "All categories", body = ApiResponse<Vec<category::Model>>)),
    tag = "Catalog"
)]
pub async fn list(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<category::Model>>>, ServiceError> {
    Ok(Json(ApiResponse::success(
        state.services.catalog.list_categories().await?,
    )))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category", body = ApiResponse<category::Model>),
        (status = 404, description = "Unknown category", body = crate::errors::ErrorBody)
    ),
    tag = "Catalog"
)]
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<category::Model>>, ServiceError> {
    Ok(Json(ApiResponse::success(
        state.services.catalog.get_category(id).await?,
    )))
}

#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CreateCategoryInput,
    responses((status = 201, description = "Category created", body = ApiResponse<category::Model>)),
    security(("bearer" = [])),
    tag = "Catalog"
)]
pub async fn create(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(input): Json<CreateCategoryInput>,
) -> Result<(StatusCode, Json<ApiResponse<category::Model>>), ServiceError> {
    let created = state.services.catalog.create_category(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    request_body = UpdateCategoryInput,
    responses((status = 200, description = "Category updated", body = ApiResponse<category::Model>)),
    security(("bearer" = [])),
    tag = "Catalog"
)]
pub async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateCategoryInput>,
) -> Result<Json<ApiResponse<category::Model>>, ServiceError> {
    Ok(Json(ApiResponse::success(
        state.services.catalog.update_category(id, input).await?,
    )))
}

#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category deleted"),
        (status = 400, description = "Category still has products", body = crate::errors::ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "Catalog"
)]
pub async fn remove(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.services.catalog.delete_category(id).await?;
    Ok(Json(ApiResponse::success(())))
}
