//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument and return raw `sqlx`
//! results. Domain semantics (not-found, conflicts) are applied one level
//! up in [`crate::pg::PgStore`].

pub mod device_repo;
pub mod session_repo;
pub mod user_repo;

pub use device_repo::DeviceRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
