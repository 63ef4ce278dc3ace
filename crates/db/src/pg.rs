//! Postgres-backed [`AuthStore`].

use async_trait::async_trait;
use warden_core::error::AuthError;
use warden_core::types::{DbId, Timestamp};

use crate::models::device::{CreateDevice, Device};
use crate::models::session::{CreateSession, RotateSession, Session};
use crate::models::user::{CreateUser, UpdateUser, User};
use crate::repositories::{DeviceRepo, SessionRepo, UserRepo};
use crate::store::{AuthStore, DeviceRegistry, SessionStore, UserStore};
use crate::DbPool;

/// Adapts the repositories to the store traits, translating `None` results
/// into domain errors and `sqlx` failures into [`AuthError::Storage`].
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn storage(operation: &'static str) -> impl FnOnce(sqlx::Error) -> AuthError {
    move |err| AuthError::storage(operation, err)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, input: &CreateUser) -> Result<User, AuthError> {
        UserRepo::create(&self.pool, input)
            .await
            .map_err(storage("create_user"))?
            .ok_or(AuthError::EmailTaken)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        UserRepo::find_by_email(&self.pool, email)
            .await
            .map_err(storage("find_user_by_email"))
    }

    async fn find_user(&self, id: DbId) -> Result<Option<User>, AuthError> {
        UserRepo::find_by_id(&self.pool, id)
            .await
            .map_err(storage("find_user"))
    }

    async fn update_user(&self, id: DbId, input: &UpdateUser) -> Result<User, AuthError> {
        match UserRepo::update(&self.pool, id, input).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(AuthError::UserNotFound),
            Err(err) if is_unique_violation(&err) => Err(AuthError::EmailTaken),
            Err(err) => Err(AuthError::storage("update_user", err)),
        }
    }

    async fn delete_user(&self, id: DbId) -> Result<User, AuthError> {
        UserRepo::soft_delete(&self.pool, id)
            .await
            .map_err(storage("delete_user"))?
            .ok_or(AuthError::UserNotFound)
    }
}

#[async_trait]
impl DeviceRegistry for PgStore {
    async fn lookup_device(&self, user_id: DbId, user_agent: &str) -> Result<Device, AuthError> {
        DeviceRepo::find_attached(&self.pool, user_id, user_agent)
            .await
            .map_err(storage("lookup_device"))?
            .ok_or(AuthError::DeviceNotFound)
    }

    async fn register_device(&self, input: &CreateDevice) -> Result<Device, AuthError> {
        if let Some(device) = DeviceRepo::create(&self.pool, input)
            .await
            .map_err(storage("register_device"))?
        {
            return Ok(device);
        }

        tracing::debug!(
            user_id = input.user_id,
            "Device registered concurrently, resolving existing row"
        );
        self.lookup_device(input.user_id, &input.user_agent).await
    }

    async fn get_device(&self, user_id: DbId, device_id: DbId) -> Result<Device, AuthError> {
        DeviceRepo::find_by_id(&self.pool, user_id, device_id)
            .await
            .map_err(storage("get_device"))?
            .ok_or(AuthError::DeviceNotFound)
    }

    async fn list_devices(&self, user_id: DbId) -> Result<Vec<Device>, AuthError> {
        DeviceRepo::list_for_user(&self.pool, user_id)
            .await
            .map_err(storage("list_devices"))
    }

    async fn detach_device(&self, user_id: DbId, device_id: DbId) -> Result<Device, AuthError> {
        DeviceRepo::detach(&self.pool, user_id, device_id)
            .await
            .map_err(storage("detach_device"))?
            .ok_or(AuthError::DeviceNotFound)
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn create_session(&self, input: &CreateSession) -> Result<Session, AuthError> {
        SessionRepo::create_if_vacant(&self.pool, input)
            .await
            .map_err(storage("create_session"))?
            .ok_or_else(|| {
                AuthError::Conflict(format!(
                    "device {} already has a live session",
                    input.device_id
                ))
            })
    }

    async fn rotate_session(
        &self,
        old_hash: &str,
        input: &RotateSession,
    ) -> Result<Session, AuthError> {
        SessionRepo::rotate(&self.pool, old_hash, input)
            .await
            .map_err(storage("rotate_session"))?
            .ok_or(AuthError::SessionNotFound)
    }

    async fn get_session_by_refresh_token(&self, hash: &str) -> Result<Session, AuthError> {
        SessionRepo::find_by_token_hash(&self.pool, hash)
            .await
            .map_err(storage("get_session_by_refresh_token"))?
            .ok_or(AuthError::SessionNotFound)
    }

    async fn get_session_by_device(
        &self,
        user_id: DbId,
        device_id: DbId,
    ) -> Result<Session, AuthError> {
        SessionRepo::find_by_device(&self.pool, user_id, device_id)
            .await
            .map_err(storage("get_session_by_device"))?
            .ok_or(AuthError::SessionNotFound)
    }

    async fn delete_session_by_device(
        &self,
        user_id: DbId,
        device_id: DbId,
    ) -> Result<bool, AuthError> {
        SessionRepo::delete_by_device(&self.pool, user_id, device_id)
            .await
            .map_err(storage("delete_session_by_device"))
    }

    async fn delete_other_sessions(
        &self,
        user_id: DbId,
        keep_device_id: DbId,
    ) -> Result<u64, AuthError> {
        SessionRepo::delete_for_user_except(&self.pool, user_id, keep_device_id)
            .await
            .map_err(storage("delete_other_sessions"))
    }

    async fn purge_expired_sessions(&self, now: Timestamp) -> Result<u64, AuthError> {
        SessionRepo::delete_expired(&self.pool, now)
            .await
            .map_err(storage("purge_expired_sessions"))
    }
}

#[async_trait]
impl AuthStore for PgStore {
    async fn ping(&self) -> Result<(), AuthError> {
        crate::health_check(&self.pool)
            .await
            .map_err(storage("ping"))
    }
}
