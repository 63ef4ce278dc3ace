//! Repository for the `sessions` table.
//!
//! Every write here is a single statement so that its conditions are
//! evaluated atomically by Postgres. In particular [`SessionRepo::rotate`]
//! is a compare-and-swap on the old token hash: when two transactions race
//! on the same row, the loser re-evaluates the `WHERE` clause against the
//! committed winner and matches nothing.

use sqlx::PgPool;
use warden_core::types::{DbId, Timestamp};

use crate::models::session::{CreateSession, RotateSession, Session};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "refresh_token_hash, user_id, device_id, expires_at, created_at, updated_at";

/// Provides the session lifecycle queries.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a session for a device that has no live session.
    ///
    /// An expired row for the same device is overwritten in place. Returns
    /// `None` when the device still has a live session.
    pub async fn create_if_vacant(
        pool: &PgPool,
        input: &CreateSession,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!(
            "INSERT INTO sessions (refresh_token_hash, user_id, device_id, expires_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (device_id) DO UPDATE SET
                refresh_token_hash = EXCLUDED.refresh_token_hash,
                user_id = EXCLUDED.user_id,
                expires_at = EXCLUDED.expires_at,
                created_at = NOW(),
                updated_at = NOW()
             WHERE sessions.expires_at < NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(&input.refresh_token_hash)
            .bind(input.user_id)
            .bind(input.device_id)
            .bind(input.expires_at)
            .fetch_optional(pool)
            .await
    }

    /// Find a session by refresh token hash, expired or not.
    pub async fn find_by_token_hash(
        pool: &PgPool,
        hash: &str,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sessions WHERE refresh_token_hash = $1");
        sqlx::query_as::<_, Session>(&query)
            .bind(hash)
            .fetch_optional(pool)
            .await
    }

    /// Find the session row of a device.
    pub async fn find_by_device(
        pool: &PgPool,
        user_id: DbId,
        device_id: DbId,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM sessions WHERE user_id = $1 AND device_id = $2");
        sqlx::query_as::<_, Session>(&query)
            .bind(user_id)
            .bind(device_id)
            .fetch_optional(pool)
            .await
    }

    /// Swap an unexpired session's token hash, expiry and device.
    ///
    /// Returns `None` if `old_hash` does not match a live row, which includes
    /// the case where a concurrent rotation already replaced it.
    pub async fn rotate(
        pool: &PgPool,
        old_hash: &str,
        input: &RotateSession,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!(
            "UPDATE sessions SET
                refresh_token_hash = $2,
                expires_at = $3,
                device_id = $4,
                updated_at = NOW()
             WHERE refresh_token_hash = $1 AND expires_at >= NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(old_hash)
            .bind(&input.refresh_token_hash)
            .bind(input.expires_at)
            .bind(input.device_id)
            .fetch_optional(pool)
            .await
    }

    /// Delete a device's session. Returns `true` if a row was removed.
    pub async fn delete_by_device(
        pool: &PgPool,
        user_id: DbId,
        device_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND device_id = $2")
            .bind(user_id)
            .bind(device_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every session of a user except the one bound to `keep_device_id`.
    /// Returns the count of deleted rows.
    pub async fn delete_for_user_except(
        pool: &PgPool,
        user_id: DbId,
        keep_device_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND device_id <> $2")
            .bind(user_id)
            .bind(keep_device_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete sessions that expired before `now`. Returns the count of deleted rows.
    pub async fn delete_expired(pool: &PgPool, now: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < $1")
            .bind(now)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
