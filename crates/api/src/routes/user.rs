//! Route definitions for the `/users` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::user;
use crate::state::AppState;

/// Routes mounted at `/users`.
///
/// ```text
/// GET    /me  -> me (requires auth)
/// PATCH  /me  -> update_me (requires auth)
/// DELETE /me  -> delete_me (requires auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/me",
        get(user::me).patch(user::update_me).delete(user::delete_me),
    )
}
