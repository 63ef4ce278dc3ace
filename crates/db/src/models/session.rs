//! Session model and DTOs.

use sqlx::FromRow;
use warden_core::types::{DbId, Timestamp};

/// A session row from the `sessions` table.
///
/// Keyed by the SHA-256 hex digest of the refresh token; the plaintext is
/// never stored. There is at most one row per `device_id`.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Session {
    pub refresh_token_hash: String,
    pub user_id: DbId,
    pub device_id: DbId,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Session {
    /// A session is expired once `now` is strictly past `expires_at`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }
}

/// DTO for creating a new session.
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub user_id: DbId,
    pub device_id: DbId,
    pub refresh_token_hash: String,
    pub expires_at: Timestamp,
}

/// New values written over a session row when its refresh token rotates.
#[derive(Debug, Clone)]
pub struct RotateSession {
    pub refresh_token_hash: String,
    pub expires_at: Timestamp,
    /// Usually the row's current device. Differs only when the device row
    /// went missing and was re-registered during refresh.
    pub device_id: DbId,
}
