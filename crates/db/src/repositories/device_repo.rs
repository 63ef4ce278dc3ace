//! Repository for the `devices` table.

use sqlx::PgPool;
use warden_core::types::DbId;

use crate::models::device::{CreateDevice, Device};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, user_agent, ip, detached, detached_at, created_at";

/// Provides registration, lookup and detachment of devices.
///
/// Rows are never deleted, and `user_agent` / `ip` never change after insert.
pub struct DeviceRepo;

impl DeviceRepo {
    /// Insert a new device.
    ///
    /// Returns `None` if an attached device with the same
    /// `(user_id, user_agent)` already exists (e.g. a concurrent
    /// registration won the race).
    pub async fn create(
        pool: &PgPool,
        input: &CreateDevice,
    ) -> Result<Option<Device>, sqlx::Error> {
        let query = format!(
            "INSERT INTO devices (user_id, user_agent, ip)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id, user_agent) WHERE detached = false DO NOTHING
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Device>(&query)
            .bind(input.user_id)
            .bind(&input.user_agent)
            .bind(&input.ip)
            .fetch_optional(pool)
            .await
    }

    /// Find the attached device for a user agent.
    pub async fn find_attached(
        pool: &PgPool,
        user_id: DbId,
        user_agent: &str,
    ) -> Result<Option<Device>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM devices
             WHERE user_id = $1 AND user_agent = $2 AND detached = false"
        );
        sqlx::query_as::<_, Device>(&query)
            .bind(user_id)
            .bind(user_agent)
            .fetch_optional(pool)
            .await
    }

    /// Find a device owned by `user_id`, detached or not.
    pub async fn find_by_id(
        pool: &PgPool,
        user_id: DbId,
        id: DbId,
    ) -> Result<Option<Device>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM devices WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, Device>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// List a user's devices, most recently registered first.
    pub async fn list_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<Device>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM devices WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Device>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Mark an attached device as detached.
    ///
    /// Returns `None` if no attached device with that id belongs to the user.
    pub async fn detach(
        pool: &PgPool,
        user_id: DbId,
        id: DbId,
    ) -> Result<Option<Device>, sqlx::Error> {
        let query = format!(
            "UPDATE devices SET detached = true, detached_at = NOW()
             WHERE id = $1 AND user_id = $2 AND detached = false
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Device>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }
}
