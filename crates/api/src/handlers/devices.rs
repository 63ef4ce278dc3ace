//! Handlers for the caller's registered devices.

use axum::extract::{Path, State};
use axum::Json;
use warden_core::types::DbId;
use warden_db::models::device::Device;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/auth/devices
///
/// All devices of the authenticated user, detached ones included, newest first.
pub async fn list_devices(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<Device>>>> {
    let devices = state.sessions.list_devices(auth_user.user_id).await?;
    Ok(Json(DataResponse { data: devices }))
}

/// DELETE /api/v1/auth/devices/{id}
///
/// Detach a device and end its session. Detaching the calling device is
/// allowed; its access token stays valid until it expires.
pub async fn detach_device(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(device_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Device>>> {
    let device = state
        .sessions
        .detach_device(auth_user.user_id, device_id)
        .await?;
    Ok(Json(DataResponse { data: device }))
}
