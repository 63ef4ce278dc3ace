use std::sync::Arc;

use crate::auth::jwt::TokenVerifier;
use crate::auth::service::SessionService;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Session lifecycle over the configured store.
    pub sessions: Arc<SessionService>,
    /// Access-token verifier used by the [`AuthUser`](crate::middleware::auth::AuthUser) extractor.
    pub verifier: Arc<TokenVerifier>,
}

impl AppState {
    /// Build the state around an already-constructed session service.
    pub fn new(config: ServerConfig, sessions: SessionService) -> Self {
        let verifier = TokenVerifier::new(&config.jwt);
        Self {
            config: Arc::new(config),
            sessions: Arc::new(sessions),
            verifier: Arc::new(verifier),
        }
    }
}
