//! In-process [`AuthStore`] for tests and local development.
//!
//! All state sits behind one async mutex held for the full duration of each
//! operation, which gives every method the same atomicity the Postgres
//! statements provide. An optional artificial latency is applied before the
//! lock is taken so callers can exercise their deadlines.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, MutexGuard};
use warden_core::error::AuthError;
use warden_core::types::{DbId, Timestamp};

use crate::models::device::{CreateDevice, Device};
use crate::models::session::{CreateSession, RotateSession, Session};
use crate::models::user::{CreateUser, UpdateUser, User};
use crate::store::{AuthStore, DeviceRegistry, SessionStore, UserStore};

#[derive(Default)]
struct MemoryState {
    next_user_id: DbId,
    next_device_id: DbId,
    users: BTreeMap<DbId, User>,
    devices: BTreeMap<DbId, Device>,
    sessions: HashMap<String, Session>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that sleeps for `latency` before every operation.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            state: Mutex::default(),
            latency: Some(latency),
        }
    }

    /// Snapshot of every stored session row, expired ones included.
    pub async fn sessions(&self) -> Vec<Session> {
        self.state.lock().await.sessions.values().cloned().collect()
    }

    /// Remove a device row outright. Real stores never do this; it lets
    /// tests exercise the re-registration path.
    pub async fn forget_device(&self, device_id: DbId) -> Option<Device> {
        self.state.lock().await.devices.remove(&device_id)
    }

    async fn state(&self) -> MutexGuard<'_, MemoryState> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.state.lock().await
    }
}

fn find_attached<'a>(
    state: &'a MemoryState,
    user_id: DbId,
    user_agent: &str,
) -> Option<&'a Device> {
    state
        .devices
        .values()
        .find(|d| d.user_id == user_id && d.user_agent == user_agent && !d.detached)
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, input: &CreateUser) -> Result<User, AuthError> {
        let mut state = self.state().await;
        let taken = state
            .users
            .values()
            .any(|u| u.email == input.email && u.deleted_at.is_none());
        if taken {
            return Err(AuthError::EmailTaken);
        }

        state.next_user_id += 1;
        let now = Utc::now();
        let user = User {
            id: state.next_user_id,
            email: input.email.clone(),
            password_hash: input.password_hash.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let state = self.state().await;
        Ok(state
            .users
            .values()
            .find(|u| u.email == email && u.deleted_at.is_none())
            .cloned())
    }

    async fn find_user(&self, id: DbId) -> Result<Option<User>, AuthError> {
        let state = self.state().await;
        Ok(state
            .users
            .get(&id)
            .filter(|u| u.deleted_at.is_none())
            .cloned())
    }

    async fn update_user(&self, id: DbId, input: &UpdateUser) -> Result<User, AuthError> {
        let mut state = self.state().await;
        if let Some(email) = &input.email {
            let taken = state
                .users
                .values()
                .any(|u| u.id != id && &u.email == email && u.deleted_at.is_none());
            if taken {
                return Err(AuthError::EmailTaken);
            }
        }

        let user = state
            .users
            .get_mut(&id)
            .filter(|u| u.deleted_at.is_none())
            .ok_or(AuthError::UserNotFound)?;
        if let Some(email) = &input.email {
            user.email = email.clone();
        }
        if let Some(password_hash) = &input.password_hash {
            user.password_hash = password_hash.clone();
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete_user(&self, id: DbId) -> Result<User, AuthError> {
        let mut state = self.state().await;
        let now = Utc::now();
        let user = state
            .users
            .get_mut(&id)
            .filter(|u| u.deleted_at.is_none())
            .ok_or(AuthError::UserNotFound)?;
        user.deleted_at = Some(now);
        user.updated_at = now;
        let user = user.clone();

        state.sessions.retain(|_, s| s.user_id != id);
        Ok(user)
    }
}

#[async_trait]
impl DeviceRegistry for MemoryStore {
    async fn lookup_device(&self, user_id: DbId, user_agent: &str) -> Result<Device, AuthError> {
        let state = self.state().await;
        find_attached(&state, user_id, user_agent)
            .cloned()
            .ok_or(AuthError::DeviceNotFound)
    }

    async fn register_device(&self, input: &CreateDevice) -> Result<Device, AuthError> {
        let mut state = self.state().await;
        if let Some(existing) = find_attached(&state, input.user_id, &input.user_agent) {
            return Ok(existing.clone());
        }

        state.next_device_id += 1;
        let device = Device {
            id: state.next_device_id,
            user_id: input.user_id,
            user_agent: input.user_agent.clone(),
            ip: input.ip.clone(),
            detached: false,
            detached_at: None,
            created_at: Utc::now(),
        };
        state.devices.insert(device.id, device.clone());
        Ok(device)
    }

    async fn get_device(&self, user_id: DbId, device_id: DbId) -> Result<Device, AuthError> {
        let state = self.state().await;
        state
            .devices
            .get(&device_id)
            .filter(|d| d.user_id == user_id)
            .cloned()
            .ok_or(AuthError::DeviceNotFound)
    }

    async fn list_devices(&self, user_id: DbId) -> Result<Vec<Device>, AuthError> {
        let state = self.state().await;
        Ok(state
            .devices
            .values()
            .rev()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn detach_device(&self, user_id: DbId, device_id: DbId) -> Result<Device, AuthError> {
        let mut state = self.state().await;
        let device = state
            .devices
            .get_mut(&device_id)
            .filter(|d| d.user_id == user_id && !d.detached)
            .ok_or(AuthError::DeviceNotFound)?;
        device.detached = true;
        device.detached_at = Some(Utc::now());
        Ok(device.clone())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, input: &CreateSession) -> Result<Session, AuthError> {
        let mut state = self.state().await;
        let now = Utc::now();

        let live = state
            .sessions
            .values()
            .any(|s| s.device_id == input.device_id && !s.is_expired_at(now));
        if live {
            return Err(AuthError::Conflict(format!(
                "device {} already has a live session",
                input.device_id
            )));
        }
        if state.sessions.contains_key(&input.refresh_token_hash) {
            return Err(AuthError::Conflict("refresh token hash collision".into()));
        }

        state.sessions.retain(|_, s| s.device_id != input.device_id);
        let session = Session {
            refresh_token_hash: input.refresh_token_hash.clone(),
            user_id: input.user_id,
            device_id: input.device_id,
            expires_at: input.expires_at,
            created_at: now,
            updated_at: now,
        };
        state
            .sessions
            .insert(session.refresh_token_hash.clone(), session.clone());
        Ok(session)
    }

    async fn rotate_session(
        &self,
        old_hash: &str,
        input: &RotateSession,
    ) -> Result<Session, AuthError> {
        let mut state = self.state().await;
        let now = Utc::now();

        let old = match state.sessions.remove(old_hash) {
            Some(session) if !session.is_expired_at(now) => session,
            Some(expired) => {
                state.sessions.insert(old_hash.to_string(), expired);
                return Err(AuthError::SessionNotFound);
            }
            None => return Err(AuthError::SessionNotFound),
        };

        // One row per device: a rebind onto another device replaces its row.
        state.sessions.retain(|_, s| s.device_id != input.device_id);
        let session = Session {
            refresh_token_hash: input.refresh_token_hash.clone(),
            user_id: old.user_id,
            device_id: input.device_id,
            expires_at: input.expires_at,
            created_at: old.created_at,
            updated_at: now,
        };
        state
            .sessions
            .insert(session.refresh_token_hash.clone(), session.clone());
        Ok(session)
    }

    async fn get_session_by_refresh_token(&self, hash: &str) -> Result<Session, AuthError> {
        let state = self.state().await;
        state
            .sessions
            .get(hash)
            .cloned()
            .ok_or(AuthError::SessionNotFound)
    }

    async fn get_session_by_device(
        &self,
        user_id: DbId,
        device_id: DbId,
    ) -> Result<Session, AuthError> {
        let state = self.state().await;
        state
            .sessions
            .values()
            .find(|s| s.user_id == user_id && s.device_id == device_id)
            .cloned()
            .ok_or(AuthError::SessionNotFound)
    }

    async fn delete_session_by_device(
        &self,
        user_id: DbId,
        device_id: DbId,
    ) -> Result<bool, AuthError> {
        let mut state = self.state().await;
        let before = state.sessions.len();
        state
            .sessions
            .retain(|_, s| !(s.user_id == user_id && s.device_id == device_id));
        Ok(state.sessions.len() < before)
    }

    async fn delete_other_sessions(
        &self,
        user_id: DbId,
        keep_device_id: DbId,
    ) -> Result<u64, AuthError> {
        let mut state = self.state().await;
        let before = state.sessions.len();
        state
            .sessions
            .retain(|_, s| s.user_id != user_id || s.device_id == keep_device_id);
        Ok((before - state.sessions.len()) as u64)
    }

    async fn purge_expired_sessions(&self, now: Timestamp) -> Result<u64, AuthError> {
        let mut state = self.state().await;
        let before = state.sessions.len();
        state.sessions.retain(|_, s| !s.is_expired_at(now));
        Ok((before - state.sessions.len()) as u64)
    }
}

#[async_trait]
impl AuthStore for MemoryStore {
    async fn ping(&self) -> Result<(), AuthError> {
        Ok(())
    }
}
