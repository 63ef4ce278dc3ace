//! Authentication primitives and the session lifecycle.
//!
//! - [`jwt`] -- access-token signing/verification and refresh-token helpers.
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`cookie`] -- the http-only refresh-token cookie.
//! - [`service`] -- [`service::SessionService`]: register, login, refresh, logout.

pub mod cookie;
pub mod jwt;
pub mod password;
pub mod service;
