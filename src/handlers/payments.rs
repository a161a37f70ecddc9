use axum::extract::State;
use axum::response::Json;

use crate::auth::AuthUser;
use crate::entities::order;
use crate::errors::ServiceError;
use crate::services::payments::{CreateIntentInput, CreateIntentOutput, PaymentSuccessInput};
use crate::{ApiResponse, AppState};

#[utoipa::path(
    post,
    path = "/api/payment/create-payment-intent",
    request_body = CreateIntentInput,
    responses(
        (status = 200, description = "Client secret for the browser widget", body = ApiResponse<CreateIntentOutput>),
        (status = 400, description = "Order already paid", body = crate::errors::ErrorBody),
        (status = 403, description = "Not the owner", body = crate::errors::ErrorBody),
        (status = 502, description = "Processor error, message verbatim", body = crate::errors::ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "Payments"
)]
pub async fn create_intent(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<CreateIntentInput>,
) -> Result<Json<ApiResponse<CreateIntentOutput>>, ServiceError> {
    let output = state
        .services
        .payments
        .create_intent(input.order_id, &auth_user)
        .await?;
    Ok(Json(ApiResponse::success(output)))
}

#[utoipa::path(
    post,
    path = "/api/payment/payment-success",
    request_body = PaymentSuccessInput,
    responses(
        (status = 200, description = "Order marked paid (idempotent)", body = ApiResponse<order::Model>),
        (status = 403, description = "Not the owner", body = crate::errors::ErrorBody),
        (status = 404, description = "Unknown order", body = crate::errors::ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "Payments"
)]
pub async fn payment_success(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<PaymentSuccessInput>,
) -> Result<Json<ApiResponse<order::Model>>, ServiceError> {
    let updated = state
        .services
        .payments
        .record_success(&auth_user, input)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}
