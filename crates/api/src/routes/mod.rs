pub mod auth;
pub mod health;
pub mod user;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /auth/register                 register (public)
/// /auth/login                    login (public)
/// /auth/refresh                  refresh (refresh cookie)
/// /auth/logout                   logout (requires auth)
/// /auth/devices                  list devices (requires auth)
/// /auth/devices/{id}             detach device (requires auth)
///
/// /users/me                      current user, update, delete (requires auth)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", user::router())
}
