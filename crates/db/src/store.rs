//! Store traits consumed by the session service.
//!
//! Implementations must make every method individually atomic. The one
//! operation where this is load-bearing is
//! [`SessionStore::rotate_session`]: matching the old token and writing the
//! new one must be a single unit, never a read followed by a separate write.
//!
//! Method names are unique across the traits so they can all be called on a
//! single `dyn AuthStore` without disambiguation.

use async_trait::async_trait;
use warden_core::error::AuthError;
use warden_core::types::{DbId, Timestamp};

use crate::models::device::{CreateDevice, Device};
use crate::models::session::{CreateSession, RotateSession, Session};
use crate::models::user::{CreateUser, UpdateUser, User};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. Fails with [`AuthError::EmailTaken`] on a duplicate email.
    async fn create_user(&self, input: &CreateUser) -> Result<User, AuthError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    async fn find_user(&self, id: DbId) -> Result<Option<User>, AuthError>;

    /// Apply the set fields of `input` to a live user.
    ///
    /// Fails with [`AuthError::UserNotFound`] for a missing or deleted user
    /// and [`AuthError::EmailTaken`] if another live user holds the new email.
    async fn update_user(&self, id: DbId, input: &UpdateUser) -> Result<User, AuthError>;

    /// Soft-delete a live user and drop every session they hold, as one unit.
    ///
    /// Devices are kept. The email becomes free for a new registration.
    /// Fails with [`AuthError::UserNotFound`] if there is no live user.
    async fn delete_user(&self, id: DbId) -> Result<User, AuthError>;
}

#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Find the attached device for `(user_id, user_agent)`.
    ///
    /// Fails with [`AuthError::DeviceNotFound`] when there is none.
    async fn lookup_device(&self, user_id: DbId, user_agent: &str) -> Result<Device, AuthError>;

    /// Register a device. If an attached device with the same identity was
    /// registered concurrently, that device is returned instead.
    async fn register_device(&self, input: &CreateDevice) -> Result<Device, AuthError>;

    /// Fetch a device owned by `user_id`, detached or not.
    async fn get_device(&self, user_id: DbId, device_id: DbId) -> Result<Device, AuthError>;

    async fn list_devices(&self, user_id: DbId) -> Result<Vec<Device>, AuthError>;

    /// Soft-revoke an attached device.
    ///
    /// Fails with [`AuthError::DeviceNotFound`] if the device does not belong
    /// to the user or is already detached.
    async fn detach_device(&self, user_id: DbId, device_id: DbId) -> Result<Device, AuthError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a session. Fails with [`AuthError::Conflict`] if the device
    /// already has a live session; an expired one is replaced.
    async fn create_session(&self, input: &CreateSession) -> Result<Session, AuthError>;

    /// Atomically replace the live session addressed by `old_hash`.
    ///
    /// Fails with [`AuthError::SessionNotFound`] if nothing matched. Of two
    /// concurrent calls with the same `old_hash`, exactly one succeeds.
    async fn rotate_session(
        &self,
        old_hash: &str,
        input: &RotateSession,
    ) -> Result<Session, AuthError>;

    /// Resolve a session by token hash. Expired rows are still returned.
    async fn get_session_by_refresh_token(&self, hash: &str) -> Result<Session, AuthError>;

    async fn get_session_by_device(
        &self,
        user_id: DbId,
        device_id: DbId,
    ) -> Result<Session, AuthError>;

    /// Remove a device's session. Idempotent; returns whether a row existed.
    async fn delete_session_by_device(
        &self,
        user_id: DbId,
        device_id: DbId,
    ) -> Result<bool, AuthError>;

    /// Remove every session of `user_id` not bound to `keep_device_id`.
    /// Returns how many were removed.
    async fn delete_other_sessions(
        &self,
        user_id: DbId,
        keep_device_id: DbId,
    ) -> Result<u64, AuthError>;

    /// Remove every session that expired before `now`.
    async fn purge_expired_sessions(&self, now: Timestamp) -> Result<u64, AuthError>;
}

/// The full persistence surface: users, devices and sessions behind one
/// handle, plus a liveness probe.
#[async_trait]
pub trait AuthStore: UserStore + DeviceRegistry + SessionStore {
    async fn ping(&self) -> Result<(), AuthError>;
}
