use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use uuid::Uuid;

use crate::auth::{AdminUser, AuthUser};
use crate::entities::order;
use crate::errors::ServiceError;
use crate::services::orders::{CreateOrderInput, OrderView, UpdateOrderStatusInput};
use crate::{ApiResponse, AppState};

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderInput,
    responses(
        (status = 201, description = "Order created", body = ApiResponse<OrderView>),
        (status = 400, description = "Empty cart, bad address or mismatched totals", body = crate::errors::ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "Orders"
)]
pub async fn create(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<CreateOrderInput>,
) -> Result<(StatusCode, Json<ApiResponse<OrderView>>), ServiceError> {
    let created = state
        .services
        .orders
        .create_order(auth_user.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

#[utoipa::path(
    get,
    path = "/api/orders/myorders",
    responses((status = 200, description = "Own orders, newest first", body = ApiResponse<Vec<OrderView>>)),
    security(("bearer" = [])),
    tag = "Orders"
)]
pub async fn list_mine(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<OrderView>>>, ServiceError> {
    Ok(Json(ApiResponse::success(
        state.services.orders.list_for_user(auth_user.user_id).await?,
    )))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    responses((status = 200, description = "All orders with owners, newest first", body = ApiResponse<Vec<OrderView>>)),
    security(("bearer" = [])),
    tag = "Orders"
)]
pub async fn list_all(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<ApiResponse<Vec<OrderView>>>, ServiceError> {
    Ok(Json(ApiResponse::success(
        state.services.orders.list_all().await?,
    )))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order", body = ApiResponse<OrderView>),
        (status = 403, description = "Not the owner", body = crate::errors::ErrorBody),
        (status = 404, description = "Unknown order", body = crate::errors::ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "Orders"
)]
pub async fn get(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderView>>, ServiceError> {
    Ok(Json(ApiResponse::success(
        state
            .services
            .orders
            .get_order_authorized(id, &auth_user)
            .await?,
    )))
}

#[utoipa::path(
    put,
    path = "/api/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateOrderStatusInput,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<order::Model>),
        (status = 400, description = "Unrecognized status", body = crate::errors::ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "Orders"
)]
pub async fn update_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateOrderStatusInput>,
) -> Result<Json<ApiResponse<order::Model>>, ServiceError> {
    Ok(Json(ApiResponse::success(
        state.services.orders.update_status(id, input).await?,
    )))
}
