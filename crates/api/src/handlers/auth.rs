//! Handlers for the `/auth` resource (register, login, refresh, logout).
//!
//! Every successful credential exchange answers with the refresh token twice:
//! in the http-only cookie browsers use, and in the body for non-browser
//! clients. Refresh only ever reads the cookie.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;
use warden_core::types::DbId;

use crate::auth::cookie::set_cookie_header;
use crate::auth::password::MIN_PASSWORD_LENGTH;
use crate::auth::service::IssuedTokens;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::fingerprint::ClientFingerprint;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(
        min = MIN_PASSWORD_LENGTH,
        message = "Password must be at least 8 characters"
    ))]
    pub password: String,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Successful authentication response returned by register, login and refresh.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user_id: DbId,
    pub device_id: DbId,
}

impl From<&IssuedTokens> for TokenResponse {
    fn from(tokens: &IssuedTokens) -> Self {
        Self {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            token_type: "Bearer",
            expires_in: tokens.expires_in(),
            user_id: tokens.user_id,
            device_id: tokens.device_id,
        }
    }
}

/// Message-only payload for logout and account deletion.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/register
///
/// Create an account and sign the registering device in. Returns 201.
pub async fn register(
    State(state): State<AppState>,
    ClientFingerprint(fingerprint): ClientFingerprint,
    Json(input): Json<RegisterRequest>,
) -> AppResult<Response> {
    let input = RegisterRequest {
        email: normalize_email(&input.email),
        password: input.password,
    };
    validate(&input)?;

    let tokens = state
        .sessions
        .register(&input.email, &input.password, &fingerprint)
        .await?;

    Ok(token_response(&state, StatusCode::CREATED, &tokens))
}

/// POST /api/v1/auth/login
///
/// Authenticate with email + password and open a session for this device.
pub async fn login(
    State(state): State<AppState>,
    ClientFingerprint(fingerprint): ClientFingerprint,
    Json(input): Json<LoginRequest>,
) -> AppResult<Response> {
    let input = LoginRequest {
        email: normalize_email(&input.email),
        password: input.password,
    };
    validate(&input)?;

    let tokens = state
        .sessions
        .login(&input.email, &input.password, &fingerprint)
        .await?;

    Ok(token_response(&state, StatusCode::OK, &tokens))
}

/// POST /api/v1/auth/refresh
///
/// Exchange the refresh cookie for new credentials. The old refresh token is
/// invalid afterwards.
pub async fn refresh(
    State(state): State<AppState>,
    ClientFingerprint(fingerprint): ClientFingerprint,
    headers: HeaderMap,
) -> AppResult<Response> {
    let refresh_token = state
        .config
        .cookie
        .read(&headers)
        .ok_or_else(|| AppError::Unauthorized("Missing refresh token cookie".into()))?;

    let tokens = state.sessions.refresh(&refresh_token, &fingerprint).await?;

    Ok(token_response(&state, StatusCode::OK, &tokens))
}

/// POST /api/v1/auth/logout
///
/// End the session of the calling device and clear the refresh cookie.
pub async fn logout(State(state): State<AppState>, auth_user: AuthUser) -> AppResult<Response> {
    state.sessions.logout(&auth_user.claims).await?;

    let cleared = state.config.cookie.clear();
    Ok((
        StatusCode::OK,
        set_cookie_header(&cleared),
        Json(DataResponse {
            data: MessageResponse {
                message: "Logged out",
            },
        }),
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn validate(input: &impl Validate) -> AppResult<()> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(format!("Validation failed: {e}")))
}

/// Body + refresh cookie for a credential exchange.
fn token_response(state: &AppState, status: StatusCode, tokens: &IssuedTokens) -> Response {
    let cookie = state
        .config
        .cookie
        .issue(&tokens.refresh_token, tokens.refresh_expires_at);

    (
        status,
        set_cookie_header(&cookie),
        Json(TokenResponse::from(tokens)),
    )
        .into_response()
}
