//! Refresh-token cookie transport.
//!
//! The refresh token travels only in an http-only cookie scoped to the auth
//! routes, so page scripts can never read it.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use cookie::time::{Duration as CookieDuration, OffsetDateTime};
use cookie::{Cookie, SameSite};
use warden_core::types::Timestamp;

/// Default cookie name.
const DEFAULT_COOKIE_NAME: &str = "refresh_token";
/// Default cookie path: only the auth routes ever need the refresh token.
const DEFAULT_COOKIE_PATH: &str = "/api/v1/auth";

/// Refresh-cookie attributes.
#[derive(Debug, Clone)]
pub struct RefreshCookieConfig {
    pub name: String,
    /// `None` produces a host-only cookie.
    pub domain: Option<String>,
    pub path: String,
    /// Set the `Secure` attribute. Disable only for plain-HTTP local development.
    pub secure: bool,
}

impl Default for RefreshCookieConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.to_string(),
            domain: None,
            path: DEFAULT_COOKIE_PATH.to_string(),
            secure: true,
        }
    }
}

impl RefreshCookieConfig {
    /// Load cookie settings from environment variables.
    ///
    /// | Env Var                 | Default          |
    /// |-------------------------|------------------|
    /// | `REFRESH_COOKIE_NAME`   | `refresh_token`  |
    /// | `REFRESH_COOKIE_DOMAIN` | unset            |
    /// | `REFRESH_COOKIE_PATH`   | `/api/v1/auth`   |
    /// | `REFRESH_COOKIE_SECURE` | `true`           |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let name = std::env::var("REFRESH_COOKIE_NAME").unwrap_or(defaults.name);
        let domain = std::env::var("REFRESH_COOKIE_DOMAIN")
            .ok()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        let path = std::env::var("REFRESH_COOKIE_PATH").unwrap_or(defaults.path);
        let secure: bool = std::env::var("REFRESH_COOKIE_SECURE")
            .map(|v| v.parse().expect("REFRESH_COOKIE_SECURE must be true or false"))
            .unwrap_or(defaults.secure);

        Self {
            name,
            domain,
            path,
            secure,
        }
    }

    fn builder(&self, value: String) -> cookie::CookieBuilder<'static> {
        let mut builder = Cookie::build((self.name.clone(), value))
            .path(self.path.clone())
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Strict);
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        builder
    }

    /// Cookie carrying `token`, expiring with its session.
    pub fn issue(&self, token: &str, expires_at: Timestamp) -> Cookie<'static> {
        let mut builder = self.builder(token.to_string());
        if let Ok(expires) = OffsetDateTime::from_unix_timestamp(expires_at.timestamp()) {
            builder = builder.expires(expires);
        }
        builder.build()
    }

    /// Empty cookie that makes the browser drop the refresh token.
    pub fn clear(&self) -> Cookie<'static> {
        self.builder(String::new())
            .max_age(CookieDuration::ZERO)
            .expires(OffsetDateTime::UNIX_EPOCH)
            .build()
    }

    /// Read the refresh token from the request's `Cookie` headers.
    pub fn read(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .find(|cookie| cookie.name() == self.name)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    }
}

/// Render a cookie as a `Set-Cookie` response header.
pub fn set_cookie_header(cookie: &Cookie<'_>) -> [(HeaderName, HeaderValue); 1] {
    // Cookie names and values produced above are always valid header text.
    let value = HeaderValue::from_str(&cookie.to_string())
        .unwrap_or_else(|_| HeaderValue::from_static(""));
    [(SET_COOKIE, value)]
}
