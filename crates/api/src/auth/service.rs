//! Session lifecycle orchestration.
//!
//! [`SessionService`] is the only component that combines the device
//! registry, the session store and the token issuer. Handlers call it and
//! translate its [`AuthError`]s; they never touch the store directly.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use warden_core::error::AuthError;
use warden_core::fingerprint::DeviceFingerprint;
use warden_core::types::{DbId, Timestamp};
use warden_db::models::device::{CreateDevice, Device};
use warden_db::models::session::{CreateSession, RotateSession, Session};
use warden_db::models::user::{CreateUser, UpdateUser, User};
use warden_db::AuthStore;

use crate::auth::jwt::{hash_refresh_token, Claims, JwtConfig, TokenIssuer};
use crate::auth::password::{hash_password, verify_dummy_password, verify_password};

/// Credentials handed back after register, login and refresh.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: String,
    pub access_expires_at: Timestamp,
    /// Plaintext refresh token. Only its hash is stored.
    pub refresh_token: String,
    pub refresh_expires_at: Timestamp,
    pub user_id: DbId,
    pub device_id: DbId,
}

impl IssuedTokens {
    /// Seconds until the access token expires, never negative.
    pub fn expires_in(&self) -> i64 {
        (self.access_expires_at - Utc::now()).num_seconds().max(0)
    }
}

/// A minted credential pair before it is persisted.
struct Minted {
    access_token: String,
    access_expires_at: Timestamp,
    refresh_token: String,
    refresh_hash: String,
    refresh_expires_at: Timestamp,
}

/// Register, login, refresh and logout over an [`AuthStore`].
///
/// Holds only immutable configuration and an `Arc` to the store, so one
/// instance is shared by every request.
pub struct SessionService {
    store: Arc<dyn AuthStore>,
    issuer: TokenIssuer,
    refresh_ttl: chrono::Duration,
    store_timeout: Duration,
}

impl SessionService {
    pub fn new(store: Arc<dyn AuthStore>, jwt: &JwtConfig, store_timeout: Duration) -> Self {
        Self {
            store,
            issuer: TokenIssuer::new(jwt),
            refresh_ttl: jwt.refresh_token_ttl(),
            store_timeout,
        }
    }

    /// Create an account and open a session for the registering device.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        fingerprint: &DeviceFingerprint,
    ) -> Result<IssuedTokens, AuthError> {
        let password_hash = hash_password(password)
            .map_err(|e| AuthError::Signing(format!("password hashing failed: {e}")))?;

        let user = self
            .bounded(
                "create_user",
                self.store.create_user(&CreateUser {
                    email: email.to_string(),
                    password_hash,
                }),
            )
            .await?;

        tracing::info!(user_id = user.id, "User registered");
        self.establish_session(user.id, fingerprint).await
    }

    /// Check credentials and open (or renew) the session for this device.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        fingerprint: &DeviceFingerprint,
    ) -> Result<IssuedTokens, AuthError> {
        let Some(user) = self
            .bounded("find_user_by_email", self.store.find_user_by_email(email))
            .await?
        else {
            verify_dummy_password(password);
            return Err(AuthError::InvalidCredentials);
        };

        let valid = verify_password(password, &user.password_hash)
            .map_err(|e| AuthError::Signing(format!("password verification failed: {e}")))?;
        if !valid {
            tracing::debug!(user_id = user.id, "Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        self.establish_session(user.id, fingerprint).await
    }

    /// Exchange a refresh token for a new credential pair.
    ///
    /// The presented token is consumed: after a successful call it no longer
    /// resolves. A caller that loses a concurrent rotation of the same token
    /// gets [`AuthError::SessionNotFound`].
    pub async fn refresh(
        &self,
        refresh_token: &str,
        fingerprint: &DeviceFingerprint,
    ) -> Result<IssuedTokens, AuthError> {
        let old_hash = hash_refresh_token(refresh_token);
        let session = self
            .bounded(
                "get_session_by_refresh_token",
                self.store.get_session_by_refresh_token(&old_hash),
            )
            .await?;

        if session.is_expired_at(Utc::now()) {
            return Err(AuthError::SessionExpired);
        }

        let device = self.session_device(&session, fingerprint).await?;
        let minted = self.mint(session.user_id, device.id)?;

        let rotated = self
            .bounded(
                "rotate_session",
                self.store.rotate_session(
                    &old_hash,
                    &RotateSession {
                        refresh_token_hash: minted.refresh_hash.clone(),
                        expires_at: minted.refresh_expires_at,
                        device_id: device.id,
                    },
                ),
            )
            .await?;

        tracing::debug!(
            user_id = rotated.user_id,
            device_id = rotated.device_id,
            "Session rotated"
        );
        Ok(minted.into_tokens(rotated.user_id, rotated.device_id))
    }

    /// End the session of the device named in the verified claims.
    ///
    /// Idempotent: logging out a device without a session still succeeds.
    pub async fn logout(&self, claims: &Claims) -> Result<(), AuthError> {
        let removed = self
            .bounded(
                "delete_session_by_device",
                self.store.delete_session_by_device(claims.sub, claims.did),
            )
            .await?;

        tracing::debug!(
            user_id = claims.sub,
            device_id = claims.did,
            removed,
            "Logout"
        );
        Ok(())
    }

    /// Look up the authenticated user.
    ///
    /// A valid token for a user that no longer exists is treated as an
    /// invalid token.
    pub async fn current_user(&self, user_id: DbId) -> Result<User, AuthError> {
        self.bounded("find_user", self.store.find_user(user_id))
            .await?
            .ok_or(AuthError::InvalidSignature)
    }

    pub async fn list_devices(&self, user_id: DbId) -> Result<Vec<Device>, AuthError> {
        self.bounded("list_devices", self.store.list_devices(user_id))
            .await
    }

    /// Detach one of the user's devices and end its session.
    pub async fn detach_device(&self, user_id: DbId, device_id: DbId) -> Result<Device, AuthError> {
        let device = self
            .bounded("detach_device", self.store.detach_device(user_id, device_id))
            .await?;
        self.bounded(
            "delete_session_by_device",
            self.store.delete_session_by_device(user_id, device_id),
        )
        .await?;

        tracing::info!(user_id, device_id, "Device detached");
        Ok(device)
    }

    /// Change the email and/or password of the authenticated user.
    ///
    /// Values equal to the current ones are ignored; if nothing is left the
    /// call fails with [`AuthError::NoChanges`]. A new password ends every
    /// session of the user except the one on `device_id`.
    pub async fn update_account(
        &self,
        user_id: DbId,
        device_id: DbId,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<User, AuthError> {
        let user = self
            .bounded("find_user", self.store.find_user(user_id))
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let password_hash = match password {
            Some(password) => {
                let unchanged = verify_password(password, &user.password_hash).map_err(|e| {
                    AuthError::Signing(format!("password verification failed: {e}"))
                })?;
                if unchanged {
                    None
                } else {
                    Some(hash_password(password).map_err(|e| {
                        AuthError::Signing(format!("password hashing failed: {e}"))
                    })?)
                }
            }
            None => None,
        };
        let changes = UpdateUser {
            email: email.filter(|e| *e != user.email).map(str::to_string),
            password_hash,
        };
        if changes.is_empty() {
            return Err(AuthError::NoChanges);
        }

        let updated = self
            .bounded("update_user", self.store.update_user(user_id, &changes))
            .await?;

        if changes.password_hash.is_some() {
            let revoked = self
                .bounded(
                    "delete_other_sessions",
                    self.store.delete_other_sessions(user_id, device_id),
                )
                .await?;
            tracing::info!(user_id, device_id, revoked, "Password changed");
        }
        if changes.email.is_some() {
            tracing::info!(user_id, "Email changed");
        }
        Ok(updated)
    }

    /// Soft-delete the authenticated user and end all of their sessions.
    ///
    /// The email can be registered again afterwards.
    pub async fn delete_account(&self, user_id: DbId) -> Result<User, AuthError> {
        let user = self
            .bounded("delete_user", self.store.delete_user(user_id))
            .await?;
        tracing::info!(user_id, "User deleted");
        Ok(user)
    }

    /// Delete every session that has already expired.
    pub async fn purge_expired(&self) -> Result<u64, AuthError> {
        self.bounded(
            "purge_expired_sessions",
            self.store.purge_expired_sessions(Utc::now()),
        )
        .await
    }

    /// Liveness probe of the backing store.
    pub async fn ping(&self) -> Result<(), AuthError> {
        self.bounded("ping", self.store.ping()).await
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Resolve the device, then create its session or rotate the live one.
    async fn establish_session(
        &self,
        user_id: DbId,
        fingerprint: &DeviceFingerprint,
    ) -> Result<IssuedTokens, AuthError> {
        let device = self.resolve_device(user_id, fingerprint).await?;
        let minted = self.mint(user_id, device.id)?;

        let created = self
            .bounded(
                "create_session",
                self.store.create_session(&CreateSession {
                    user_id,
                    device_id: device.id,
                    refresh_token_hash: minted.refresh_hash.clone(),
                    expires_at: minted.refresh_expires_at,
                }),
            )
            .await;

        match created {
            Ok(_) => {}
            Err(AuthError::Conflict(_)) => {
                self.replace_live_session(user_id, device.id, &minted).await?;
            }
            Err(e) => return Err(e),
        }

        tracing::info!(user_id, device_id = device.id, "Session established");
        Ok(minted.into_tokens(user_id, device.id))
    }

    /// Rotate the device's current session onto `minted`.
    ///
    /// Any concurrent change to that session (another login, a refresh, a
    /// logout) surfaces as [`AuthError::Conflict`].
    async fn replace_live_session(
        &self,
        user_id: DbId,
        device_id: DbId,
        minted: &Minted,
    ) -> Result<(), AuthError> {
        let changed = || {
            AuthError::Conflict(format!("session for device {device_id} changed concurrently"))
        };

        let live = match self
            .bounded(
                "get_session_by_device",
                self.store.get_session_by_device(user_id, device_id),
            )
            .await
        {
            Err(AuthError::SessionNotFound) => return Err(changed()),
            other => other?,
        };

        match self
            .bounded(
                "rotate_session",
                self.store.rotate_session(
                    &live.refresh_token_hash,
                    &RotateSession {
                        refresh_token_hash: minted.refresh_hash.clone(),
                        expires_at: minted.refresh_expires_at,
                        device_id,
                    },
                ),
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(AuthError::SessionNotFound) => Err(changed()),
            Err(e) => Err(e),
        }
    }

    /// Find the attached device for this fingerprint, registering it if unseen.
    async fn resolve_device(
        &self,
        user_id: DbId,
        fingerprint: &DeviceFingerprint,
    ) -> Result<Device, AuthError> {
        match self
            .bounded(
                "lookup_device",
                self.store.lookup_device(user_id, &fingerprint.user_agent),
            )
            .await
        {
            Ok(device) => Ok(device),
            Err(AuthError::DeviceNotFound) => {
                let device = self
                    .bounded(
                        "register_device",
                        self.store
                            .register_device(&CreateDevice::from_fingerprint(user_id, fingerprint)),
                    )
                    .await?;
                tracing::info!(
                    user_id,
                    device_id = device.id,
                    ip = %device.ip,
                    "Device registered"
                );
                Ok(device)
            }
            Err(e) => Err(e),
        }
    }

    /// Device a session is bound to.
    ///
    /// A detached device ends its session. A device row that has vanished is
    /// re-registered from the current request.
    async fn session_device(
        &self,
        session: &Session,
        fingerprint: &DeviceFingerprint,
    ) -> Result<Device, AuthError> {
        match self
            .bounded(
                "get_device",
                self.store.get_device(session.user_id, session.device_id),
            )
            .await
        {
            Ok(device) if device.detached => {
                self.bounded(
                    "delete_session_by_device",
                    self.store
                        .delete_session_by_device(session.user_id, session.device_id),
                )
                .await?;
                tracing::info!(
                    user_id = session.user_id,
                    device_id = device.id,
                    "Refresh refused for detached device"
                );
                Err(AuthError::DeviceDetached {
                    device_id: device.id,
                })
            }
            Ok(device) => Ok(device),
            Err(AuthError::DeviceNotFound) => {
                tracing::warn!(
                    user_id = session.user_id,
                    device_id = session.device_id,
                    "Session device missing, re-registering"
                );
                self.resolve_device(session.user_id, fingerprint).await
            }
            Err(e) => Err(e),
        }
    }

    fn mint(&self, user_id: DbId, device_id: DbId) -> Result<Minted, AuthError> {
        let access = self.issuer.new_access_token(user_id, device_id)?;
        let refresh_token = self.issuer.new_refresh_token()?;
        Ok(Minted {
            access_token: access.token,
            access_expires_at: access.expires_at,
            refresh_hash: hash_refresh_token(&refresh_token),
            refresh_token,
            refresh_expires_at: Utc::now() + self.refresh_ttl,
        })
    }

    /// Run a store call under the configured deadline. On expiry the call is
    /// dropped and reported as a storage failure.
    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, AuthError>>,
    {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AuthError::storage(
                operation,
                format!("timed out after {:?}", self.store_timeout),
            )),
        }
    }
}

impl Minted {
    fn into_tokens(self, user_id: DbId, device_id: DbId) -> IssuedTokens {
        IssuedTokens {
            access_token: self.access_token,
            access_expires_at: self.access_expires_at,
            refresh_token: self.refresh_token,
            refresh_expires_at: self.refresh_expires_at,
            user_id,
            device_id,
        }
    }
}
