#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE, USER_AGENT};
use axum::http::{Method, Request, Response};
use axum::{Extension, Router};
use http_body_util::BodyExt;
use jsonwebtoken::Algorithm;
use tower::ServiceExt;
use warden_api::auth::cookie::RefreshCookieConfig;
use warden_api::auth::jwt::JwtConfig;
use warden_api::auth::service::SessionService;
use warden_api::config::ServerConfig;
use warden_api::router::build_app_router;
use warden_api::state::AppState;
use warden_db::MemoryStore;

pub const TEST_USER_AGENT: &str = "curl/8";
pub const TEST_PEER: ([u8; 4], u16) = ([1, 2, 3, 4], 5555);

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        store_timeout_ms: 2_000,
        session_purge_interval_secs: 3600,
        database_url: None,
        database_max_connections: 5,
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            algorithm: Algorithm::HS256,
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        },
        cookie: RefreshCookieConfig::default(),
    }
}

/// A router wired to a fresh in-memory store.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub config: ServerConfig,
}

/// Build the full application router (same middleware stack as `main.rs`)
/// over an in-memory store, with every request arriving from [`TEST_PEER`].
pub fn build_test_app() -> TestApp {
    build_test_app_with(test_config(), MemoryStore::new())
}

pub fn build_test_app_with(config: ServerConfig, store: MemoryStore) -> TestApp {
    let store = Arc::new(store);
    let sessions = SessionService::new(
        Arc::clone(&store) as Arc<dyn warden_db::AuthStore>,
        &config.jwt,
        Duration::from_millis(config.store_timeout_ms),
    );
    let state = AppState::new(config.clone(), sessions);
    let router = build_app_router(state, &config)
        .layer(Extension(ConnectInfo(SocketAddr::from(TEST_PEER))));

    TestApp {
        router,
        store,
        config,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        self.send(json_request(Method::POST, uri, body)).await
    }

    /// Register `email` and return the token response body plus the refresh cookie.
    pub async fn register(&self, email: &str, password: &str) -> (serde_json::Value, String) {
        let response = self
            .post_json(
                "/api/v1/auth/register",
                serde_json::json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(response.status(), 201, "registration should succeed");
        let cookie = refresh_cookie(&response).expect("register should set the refresh cookie");
        (body_json(response).await, cookie)
    }

    pub async fn refresh(&self, refresh_token: &str) -> Response<Body> {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/auth/refresh")
            .header(USER_AGENT, TEST_USER_AGENT)
            .header(COOKIE, format!("refresh_token={refresh_token}"))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    pub async fn get_auth(&self, uri: &str, access_token: &str) -> Response<Body> {
        self.send(authed_request(Method::GET, uri, access_token))
            .await
    }

    pub async fn post_auth(&self, uri: &str, access_token: &str) -> Response<Body> {
        self.send(authed_request(Method::POST, uri, access_token))
            .await
    }

    pub async fn patch_json_auth(
        &self,
        uri: &str,
        access_token: &str,
        body: serde_json::Value,
    ) -> Response<Body> {
        let mut request = json_request(Method::PATCH, uri, body);
        request.headers_mut().insert(
            AUTHORIZATION,
            format!("Bearer {access_token}").parse().unwrap(),
        );
        self.send(request).await
    }

    pub async fn delete_auth(&self, uri: &str, access_token: &str) -> Response<Body> {
        self.send(authed_request(Method::DELETE, uri, access_token))
            .await
    }
}

pub fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .header(USER_AGENT, TEST_USER_AGENT)
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

pub fn authed_request(method: Method, uri: &str, access_token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_AGENT, TEST_USER_AGENT)
        .header(AUTHORIZATION, format!("Bearer {access_token}"))
        .body(Body::empty())
        .unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// The raw `Set-Cookie` header of a response, if any.
pub fn set_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// The refresh token value carried by a response's `Set-Cookie` header.
pub fn refresh_cookie(response: &Response<Body>) -> Option<String> {
    let header = set_cookie(response)?;
    let value = header
        .split(';')
        .next()?
        .strip_prefix("refresh_token=")?
        .to_string();
    (!value.is_empty()).then_some(value)
}
