//! Domain primitives shared by the store and HTTP layers.
//!
//! - [`types`] -- id and timestamp aliases.
//! - [`error`] -- the closed [`error::AuthError`] taxonomy.
//! - [`fingerprint`] -- device fingerprint derivation from request metadata.

pub mod error;
pub mod fingerprint;
pub mod types;
