pub mod auth;
pub mod devices;
pub mod user;
