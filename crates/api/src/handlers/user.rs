//! Handlers for the `/users` resource.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use validator::Validate;
use warden_db::models::user::UserResponse;

use crate::auth::cookie::set_cookie_header;
use crate::auth::password::MIN_PASSWORD_LENGTH;
use crate::error::AppResult;
use crate::handlers::auth::{normalize_email, validate, MessageResponse};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `PATCH /users/me`. Omitted fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(
        min = MIN_PASSWORD_LENGTH,
        message = "Password must be at least 8 characters"
    ))]
    pub password: Option<String>,
}

/// GET /api/v1/users/me
pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = state.sessions.current_user(auth_user.user_id).await?;
    Ok(Json(DataResponse {
        data: UserResponse::from(user),
    }))
}

/// PATCH /api/v1/users/me
///
/// Change email and/or password. A new password signs out every other device.
pub async fn update_me(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<UpdateUserRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let input = UpdateUserRequest {
        email: input.email.as_deref().map(normalize_email),
        password: input.password,
    };
    validate(&input)?;

    let user = state
        .sessions
        .update_account(
            auth_user.user_id,
            auth_user.device_id,
            input.email.as_deref(),
            input.password.as_deref(),
        )
        .await?;

    Ok(Json(DataResponse {
        data: UserResponse::from(user),
    }))
}

/// DELETE /api/v1/users/me
///
/// Soft-delete the account, end all of its sessions and clear the refresh
/// cookie.
pub async fn delete_me(State(state): State<AppState>, auth_user: AuthUser) -> AppResult<Response> {
    state.sessions.delete_account(auth_user.user_id).await?;

    let cleared = state.config.cookie.clear();
    Ok((
        StatusCode::OK,
        set_cookie_header(&cleared),
        Json(DataResponse {
            data: MessageResponse {
                message: "User deleted",
            },
        }),
    )
        .into_response())
}
