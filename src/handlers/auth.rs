use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{user, AuthUser, LoginInput, RegisterInput, UpdateProfileInput};
use crate::errors::ServiceError;
use crate::{ApiResponse, AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: user::Model,
    pub token: String,
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterInput,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<AuthResponse>),
        (status = 400, description = "Invalid input or email taken", body = crate::errors::ErrorBody)
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), ServiceError> {
    let created = state.auth.register(input).await?;
    let token = state.auth.issue_token(&created)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(AuthResponse {
            user: created,
            token,
        })),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginInput,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<AuthResponse>),
        (status = 401, description = "Bad credentials", body = crate::errors::ErrorBody)
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> Result<Json<ApiResponse<AuthResponse>>, ServiceError> {
    let found = state.auth.login(input).await?;
    let token = state.auth.issue_token(&found)?;
    Ok(Json(ApiResponse::success(AuthResponse { user: found, token })))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current profile", body = ApiResponse<user::Model>),
        (status = 401, description = "Not authenticated", body = crate::errors::ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "Auth"
)]
pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<user::Model>>, ServiceError> {
    let found = state.auth.get_user(auth_user.user_id).await?;
    Ok(Json(ApiResponse::success(found)))
}

#[utoipa::path(
    put,
    path = "/api/auth/me",
    request_body = UpdateProfileInput,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<user::Model>),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "Auth"
)]
pub async fn update_me(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<UpdateProfileInput>,
) -> Result<Json<ApiResponse<user::Model>>, ServiceError> {
    let updated = state.auth.update_profile(auth_user.user_id, input).await?;
    Ok(Json(ApiResponse::success(updated)))
}
