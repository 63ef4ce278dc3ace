//! Device fingerprint extractor.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;
use warden_core::fingerprint::DeviceFingerprint;

/// The caller's `User-Agent` and remote IP.
///
/// The IP comes from the TCP peer address recorded by
/// `into_make_service_with_connect_info`; forwarding headers are not
/// trusted. Never rejects: missing parts fall back to empty or
/// [`UNKNOWN_IP`](warden_core::fingerprint::UNKNOWN_IP).
#[derive(Debug, Clone)]
pub struct ClientFingerprint(pub DeviceFingerprint);

impl<S> FromRequestParts<S> for ClientFingerprint
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok());
        let remote = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.to_string());

        Ok(ClientFingerprint(DeviceFingerprint::new(
            user_agent,
            remote.as_deref(),
        )))
    }
}
