use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use uuid::Uuid;

use crate::auth::{AdminUser, AuthUser};
use crate::entities::{product, product_rating};
use crate::errors::ServiceError;
use crate::services::catalog::{
    CreateProductInput, ProductDetail, ProductFilters, ProductPage, ReviewInput,
    UpdateProductInput,
};
use crate::{ApiResponse, AppState};

#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductFilters),
    responses((status = 200, description = "Filtered product page", body = ApiResponse<ProductPage>)),
    tag = "Catalog"
)]
pub async fn list(
    State(state): State<AppState>,
    Query(filters): Query<ProductFilters>,
) -> Result<Json<ApiResponse<ProductPage>>, ServiceError> {
    let page = state.services.catalog.list_products(filters).await?;
    Ok(Json(ApiResponse::success(page)))
}

#[utoipa::path(
    get,
    path = "/api/products/featured",
    responses((status = 200, description = "Featured products", body = ApiResponse<Vec<product::Model>>)),
    tag = "Catalog"
)]
pub async fn featured(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<product::Model>>>, ServiceError> {
    Ok(Json(ApiResponse::success(
        state.services.catalog.featured().await?,
    )))
}

#[utoipa::path(
    get,
    path = "/api/products/new",
    responses((status = 200, description = "New arrivals", body = ApiResponse<Vec<product::Model>>)),
    tag = "Catalog"
)]
pub async fn new_arrivals(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<product::Model>>>, ServiceError> {
    Ok(Json(ApiResponse::success(
        state.services.catalog.new_arrivals().await?,
    )))
}

#[utoipa::path(
    get,
    path = "/api/products/sale",
    responses((status = 200, description = "Discounted products", body = ApiResponse<Vec<product::Model>>)),
    tag = "Catalog"
)]
pub async fn on_sale(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<product::Model>>>, ServiceError> {
    Ok(Json(ApiResponse::success(
        state.services.catalog.on_sale().await?,
    )))
}

#[utoipa::path(
    get,
    path = "/api/products/bestsellers",
    responses((status = 200, description = "Top rated products", body = ApiResponse<Vec<product::Model>>)),
    tag = "Catalog"
)]
pub async fn bestsellers(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<product::Model>>>, ServiceError> {
    Ok(Json(ApiResponse::success(
        state.services.catalog.bestsellers().await?,
    )))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product with category and reviews", body = ApiResponse<ProductDetail>),
        (status = 404, description = "Unknown product", body = crate::errors::ErrorBody)
    ),
    tag = "Catalog"
)]
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ProductDetail>>, ServiceError> {
    Ok(Json(ApiResponse::success(
        state.services.catalog.get_product(id).await?,
    )))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductInput,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<product::Model>),
        (status = 403, description = "Admin only", body = crate::errors::ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "Catalog"
)]
pub async fn create(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(input): Json<CreateProductInput>,
) -> Result<(StatusCode, Json<ApiResponse<product::Model>>), ServiceError> {
    let created = state.services.catalog.create_product(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = UpdateProductInput,
    responses((status = 200, description = "Product updated", body = ApiResponse<product::Model>)),
    security(("bearer" = [])),
    tag = "Catalog"
)]
pub async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> Result<Json<ApiResponse<product::Model>>, ServiceError> {
    Ok(Json(ApiResponse::success(
        state.services.catalog.update_product(id, input).await?,
    )))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses((status = 200, description = "Product deleted")),
    security(("bearer" = [])),
    tag = "Catalog"
)]
pub async fn remove(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.services.catalog.delete_product(id).await?;
    Ok(Json(ApiResponse::success(())))
}

#[utoipa::path(
    post,
    path = "/api/products/{id}/reviews",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = ReviewInput,
    responses(
        (status = 201, description = "Review recorded", body = ApiResponse<product_rating::Model>),
        (status = 400, description = "Already reviewed or invalid rating", body = crate::errors::ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "Catalog"
)]
pub async fn add_review(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<ReviewInput>,
) -> Result<(StatusCode, Json<ApiResponse<product_rating::Model>>), ServiceError> {
    let reviewer = state.auth.get_user(auth_user.user_id).await?;
    let created = state
        .services
        .catalog
        .add_review(id, &auth_user, reviewer.name, input)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}
