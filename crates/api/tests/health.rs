mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{body_json, build_test_app, build_test_app_with, test_config};
use warden_db::MemoryStore;

fn health_request() -> Request<Body> {
    Request::builder().uri("/health").body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_reports_ok_with_request_id() {
    let app = build_test_app();

    let response = app.send(health_request()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["store_healthy"], true);
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn slow_store_reports_degraded() {
    let mut config = test_config();
    config.store_timeout_ms = 10;
    let app = build_test_app_with(config, MemoryStore::with_latency(Duration::from_millis(200)));

    let response = app.send(health_request()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["store_healthy"], false);
}

#[tokio::test]
async fn slow_store_fails_login_with_internal_error() {
    let mut config = test_config();
    config.store_timeout_ms = 10;
    let app = build_test_app_with(config, MemoryStore::with_latency(Duration::from_millis(200)));

    let response = app
        .post_json(
            "/api/v1/auth/login",
            serde_json::json!({ "email": "u1@example.com", "password": "whatever" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["code"], "INTERNAL_ERROR");
}
