use crate::types::DbId;

/// Every failure the session lifecycle can produce.
///
/// Domain variants (credentials, sessions, devices, tokens) are expected
/// control flow and map to 4xx responses. [`AuthError::Signing`] and
/// [`AuthError::Storage`] are infrastructure failures: they are logged and
/// returned to clients as opaque 500s.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown email or wrong password; the two are indistinguishable.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("A user with this email already exists")]
    EmailTaken,

    /// The account does not exist or has been deleted.
    #[error("User not found")]
    UserNotFound,

    /// An account update that would leave every field as it is.
    #[error("No changes detected")]
    NoChanges,

    /// The refresh token never existed, was already rotated, or lost a
    /// rotation race.
    #[error("Session not found")]
    SessionNotFound,

    /// The refresh token resolves but its session is past `expires_at`.
    #[error("Session expired")]
    SessionExpired,

    /// The session belongs to a device that has been detached.
    #[error("Device {device_id} has been detached")]
    DeviceDetached { device_id: DbId },

    /// No active device matches the lookup. Session flows resolve this by
    /// registering the device; it only reaches clients from device
    /// management endpoints.
    #[error("Device not found")]
    DeviceNotFound,

    /// The access token was tampered with, malformed, signed with another
    /// key, or signed with an unexpected algorithm.
    #[error("Invalid access token")]
    InvalidSignature,

    #[error("Access token expired")]
    TokenExpired,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("Storage failure during {operation}: {message}")]
    Storage {
        operation: &'static str,
        message: String,
    },
}

impl AuthError {
    /// Build a [`AuthError::Storage`] for the named store operation.
    pub fn storage(operation: &'static str, err: impl std::fmt::Display) -> Self {
        AuthError::Storage {
            operation,
            message: err.to_string(),
        }
    }

    /// `true` for failures that are not the client's fault.
    pub fn is_internal(&self) -> bool {
        matches!(self, AuthError::Signing(_) | AuthError::Storage { .. })
    }
}
