//! Device entity model and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use warden_core::fingerprint::DeviceFingerprint;
use warden_core::types::{DbId, Timestamp};

/// A registered device row from the `devices` table.
///
/// Rows are never deleted. `detached` is a soft revocation: a detached
/// device's session is no longer honoured and the next login from the same
/// user agent registers a fresh device.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Device {
    pub id: DbId,
    pub user_id: DbId,
    pub user_agent: String,
    /// IP observed at registration, port stripped. Not part of identity.
    pub ip: String,
    pub detached: bool,
    pub detached_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// DTO for registering a new device.
#[derive(Debug, Clone)]
pub struct CreateDevice {
    pub user_id: DbId,
    pub user_agent: String,
    pub ip: String,
}

impl CreateDevice {
    pub fn from_fingerprint(user_id: DbId, fingerprint: &DeviceFingerprint) -> Self {
        Self {
            user_id,
            user_agent: fingerprint.user_agent.clone(),
            ip: fingerprint.ip.clone(),
        }
    }
}
