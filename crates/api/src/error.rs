use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use warden_core::error::AuthError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`AuthError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A session lifecycle error from `warden_core`.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or malformed credentials (bearer header, refresh cookie).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Auth(auth) => classify_auth_error(auth),

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Map an [`AuthError`] to an HTTP status, error code and client message.
///
/// Internal failures are logged here, once, and never echoed to the client.
fn classify_auth_error(err: &AuthError) -> (StatusCode, &'static str, String) {
    if err.is_internal() {
        match err {
            AuthError::Storage { operation, message } => {
                tracing::error!(operation, error = %message, "Storage failure");
            }
            other => tracing::error!(error = %other, "Internal failure"),
        }
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            INTERNAL_MESSAGE.to_string(),
        );
    }

    let (status, code) = match err {
        AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
        AuthError::EmailTaken => (StatusCode::BAD_REQUEST, "USER_ALREADY_EXISTS"),
        AuthError::UserNotFound => (StatusCode::NOT_FOUND, "USER_NOT_FOUND"),
        AuthError::NoChanges => (StatusCode::BAD_REQUEST, "NO_CHANGES_DETECTED"),
        AuthError::SessionNotFound => (StatusCode::UNAUTHORIZED, "SESSION_NOT_FOUND"),
        AuthError::SessionExpired => (StatusCode::UNAUTHORIZED, "SESSION_EXPIRED"),
        AuthError::DeviceDetached { .. } => (StatusCode::UNAUTHORIZED, "SESSION_REVOKED"),
        AuthError::DeviceNotFound => (StatusCode::NOT_FOUND, "DEVICE_NOT_FOUND"),
        AuthError::InvalidSignature => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
        AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED"),
        AuthError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
        AuthError::Signing(_) | AuthError::Storage { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        }
    };
    (status, code, err.to_string())
}
