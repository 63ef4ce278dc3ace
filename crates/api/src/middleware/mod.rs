//! Request extractors.
//!
//! - [`auth::AuthUser`] -- the authenticated user and device from a Bearer token.
//! - [`fingerprint::ClientFingerprint`] -- user agent and remote IP of the caller.

pub mod auth;
pub mod fingerprint;
