//! Periodic removal of expired sessions.
//!
//! Expired rows are harmless (refresh rejects them and login replaces them)
//! but would otherwise accumulate for devices that never return.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::auth::service::SessionService;

/// Run the purge loop until `cancel` is triggered.
///
/// The first purge happens immediately on start.
pub async fn run(sessions: Arc<SessionService>, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = every.as_secs(), "Session purge job started");

    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session purge job stopping");
                break;
            }
            _ = interval.tick() => {
                match sessions.purge_expired().await {
                    Ok(0) => tracing::debug!("Session purge: nothing to remove"),
                    Ok(purged) => tracing::info!(purged, "Session purge: removed expired sessions"),
                    Err(e) => tracing::error!(error = %e, "Session purge failed"),
                }
            }
        }
    }
}
