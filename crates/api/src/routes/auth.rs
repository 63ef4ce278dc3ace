//! Route definitions for the `/auth` resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::{auth, devices};
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST   /register       -> register
/// POST   /login          -> login
/// POST   /refresh        -> refresh
/// POST   /logout         -> logout (requires auth)
/// GET    /devices        -> list_devices (requires auth)
/// DELETE /devices/{id}   -> detach_device (requires auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/devices", get(devices::list_devices))
        .route("/devices/{id}", delete(devices::detach_device))
}
