//! End-to-end tests for the `/auth` and `/users` routes over the in-memory store.

mod common;

use axum::body::Body;
use axum::http::header::{COOKIE, USER_AGENT};
use axum::http::{Method, Request, StatusCode};
use common::{body_json, build_test_app, json_request, refresh_cookie, set_cookie, TEST_USER_AGENT};
use serde_json::json;
use warden_db::DeviceRegistry;

const EMAIL: &str = "u1@example.com";
const PASSWORD: &str = "correct-horse";

// ---------------------------------------------------------------------------
// Register / login
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_returns_tokens_and_cookie() {
    let app = build_test_app();

    let response = app
        .post_json(
            "/api/v1/auth/register",
            json!({ "email": EMAIL, "password": PASSWORD }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let cookie = set_cookie(&response).expect("refresh cookie");
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Path=/api/v1/auth"));

    let cookie_token = refresh_cookie(&response).unwrap();
    let body = body_json(response).await;
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["refresh_token"], cookie_token.as_str());
    assert!(body["access_token"].as_str().is_some());
    assert!(body["expires_in"].as_i64().unwrap() > 0);

    let sessions = app.store.sessions().await;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].device_id, body["device_id"].as_i64().unwrap());
}

#[tokio::test]
async fn register_records_device_fingerprint() {
    let app = build_test_app();
    let (body, _) = app.register(EMAIL, PASSWORD).await;

    let response = app
        .get_auth("/api/v1/auth/devices", body["access_token"].as_str().unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let devices = body_json(response).await;
    let devices = devices["data"].as_array().unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0]["user_agent"], TEST_USER_AGENT);
    assert_eq!(devices[0]["ip"], "1.2.3.4");
    assert_eq!(devices[0]["detached"], false);
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let app = build_test_app();
    app.register(EMAIL, PASSWORD).await;

    let response = app
        .post_json(
            "/api/v1/auth/register",
            json!({ "email": "U1@Example.com", "password": PASSWORD }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "USER_ALREADY_EXISTS");
}

#[tokio::test]
async fn register_validates_input() {
    let app = build_test_app();

    let response = app
        .post_json(
            "/api/v1/auth/register",
            json!({ "email": "not-an-email", "password": PASSWORD }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");

    let response = app
        .post_json(
            "/api/v1/auth/register",
            json!({ "email": EMAIL, "password": "short" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_reuses_device_and_rotates_session() {
    let app = build_test_app();
    let (registered, first_refresh) = app.register(EMAIL, PASSWORD).await;

    let response = app
        .post_json(
            "/api/v1/auth/login",
            json!({ "email": EMAIL, "password": PASSWORD }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(body["device_id"], registered["device_id"]);
    assert_eq!(app.store.sessions().await.len(), 1);

    let stale = app.refresh(&first_refresh).await;
    assert_eq!(stale.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_with_wrong_password_is_rejected() {
    let app = build_test_app();
    app.register(EMAIL, PASSWORD).await;

    for (email, password) in [(EMAIL, "wrong-password"), ("nobody@example.com", PASSWORD)] {
        let response = app
            .post_json(
                "/api/v1/auth/login",
                json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(set_cookie(&response).is_none());
        assert_eq!(body_json(response).await["code"], "INVALID_CREDENTIALS");
    }
}

// ---------------------------------------------------------------------------
// Refresh
// ---------------------------------------------------------------------------

#[tokio::test]
async fn refresh_rotates_and_old_token_stops_working() {
    let app = build_test_app();
    let (_, r1) = app.register(EMAIL, PASSWORD).await;

    let response = app.refresh(&r1).await;
    assert_eq!(response.status(), StatusCode::OK);
    let r2 = refresh_cookie(&response).unwrap();
    assert_ne!(r1, r2);

    let replay = app.refresh(&r1).await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(replay).await["code"], "SESSION_NOT_FOUND");

    let response = app.refresh(&r2).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn refresh_without_cookie_is_unauthorized() {
    let app = build_test_app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/refresh")
        .header(USER_AGENT, TEST_USER_AGENT)
        .header(COOKIE, "theme=dark")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn refresh_of_detached_device_is_revoked() {
    let app = build_test_app();
    let (body, r1) = app.register(EMAIL, PASSWORD).await;
    let device_id = body["device_id"].as_i64().unwrap();

    // A second device detaches the first one.
    let other = app
        .send({
            let mut request = json_request(
                Method::POST,
                "/api/v1/auth/login",
                json!({ "email": EMAIL, "password": PASSWORD }),
            );
            request
                .headers_mut()
                .insert(USER_AGENT, "Mozilla/5.0".parse().unwrap());
            request
        })
        .await;
    let other = body_json(other).await;
    assert_ne!(other["device_id"], body["device_id"]);

    let response = app
        .delete_auth(
            &format!("/api/v1/auth/devices/{device_id}"),
            other["access_token"].as_str().unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["detached"], true);

    let response = app.refresh(&r1).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn refresh_after_out_of_band_detach_is_revoked() {
    let app = build_test_app();
    let (body, r1) = app.register(EMAIL, PASSWORD).await;

    app.store
        .detach_device(
            body["user_id"].as_i64().unwrap(),
            body["device_id"].as_i64().unwrap(),
        )
        .await
        .unwrap();

    let response = app.refresh(&r1).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "SESSION_REVOKED");
    assert!(app.store.sessions().await.is_empty());
}

#[tokio::test]
async fn detaching_unknown_device_is_not_found() {
    let app = build_test_app();
    let (body, _) = app.register(EMAIL, PASSWORD).await;

    let response = app
        .delete_auth(
            "/api/v1/auth/devices/999",
            body["access_token"].as_str().unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "DEVICE_NOT_FOUND");
}

// ---------------------------------------------------------------------------
// Logout / protected routes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn logout_clears_cookie_and_is_idempotent() {
    let app = build_test_app();
    let (body, r1) = app.register(EMAIL, PASSWORD).await;
    let access = body["access_token"].as_str().unwrap();

    let response = app.post_auth("/api/v1/auth/logout", access).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = set_cookie(&response).unwrap();
    assert!(cookie.starts_with("refresh_token=;"));
    assert!(cookie.contains("Max-Age=0"));
    assert!(app.store.sessions().await.is_empty());

    let again = app.post_auth("/api/v1/auth/logout", access).await;
    assert_eq!(again.status(), StatusCode::OK);

    let response = app.refresh(&r1).await;
    assert_eq!(body_json(response).await["code"], "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn me_returns_current_user_without_password_hash() {
    let app = build_test_app();
    let (body, _) = app.register(EMAIL, PASSWORD).await;

    let response = app
        .get_auth("/api/v1/users/me", body["access_token"].as_str().unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let me = body_json(response).await;
    assert_eq!(me["data"]["email"], EMAIL);
    assert_eq!(me["data"]["id"], body["user_id"]);
    assert!(me["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn protected_routes_require_bearer_token() {
    let app = build_test_app();

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1/users/me")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");

    let response = app.get_auth("/api/v1/users/me", "not.a.jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

// ---------------------------------------------------------------------------
// Account changes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn deleting_account_ends_sessions_and_frees_email() {
    let app = build_test_app();
    let (body, r1) = app.register(EMAIL, PASSWORD).await;
    let access = body["access_token"].as_str().unwrap();

    let response = app.delete_auth("/api/v1/users/me", access).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response).unwrap().contains("Max-Age=0"));
    assert_eq!(body_json(response).await["data"]["message"], "User deleted");
    assert!(app.store.sessions().await.is_empty());

    let response = app.refresh(&r1).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "SESSION_NOT_FOUND");

    let response = app.delete_auth("/api/v1/users/me", access).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "USER_NOT_FOUND");

    let (again, _) = app.register(EMAIL, PASSWORD).await;
    assert_ne!(again["user_id"], body["user_id"]);
}

#[tokio::test]
async fn password_change_signs_out_other_devices() {
    let app = build_test_app();
    let (body, here) = app.register(EMAIL, PASSWORD).await;

    let mut request = json_request(
        Method::POST,
        "/api/v1/auth/login",
        json!({ "email": EMAIL, "password": PASSWORD }),
    );
    request
        .headers_mut()
        .insert(USER_AGENT, "Mozilla/5.0".parse().unwrap());
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let there = refresh_cookie(&response).unwrap();

    let response = app
        .patch_json_auth(
            "/api/v1/users/me",
            body["access_token"].as_str().unwrap(),
            json!({ "password": "brand-new-secret" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["email"], EMAIL);

    let sessions = app.store.sessions().await;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].device_id, body["device_id"].as_i64().unwrap());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/refresh")
        .header(USER_AGENT, "Mozilla/5.0")
        .header(COOKIE, format!("refresh_token={there}"))
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(body_json(response).await["code"], "SESSION_NOT_FOUND");

    let response = app.refresh(&here).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn update_rejects_taken_email_and_no_op() {
    let app = build_test_app();
    app.register("other@example.com", PASSWORD).await;
    let (body, _) = app.register(EMAIL, PASSWORD).await;
    let access = body["access_token"].as_str().unwrap();

    let response = app
        .patch_json_auth("/api/v1/users/me", access, json!({ "email": "Other@Example.com" }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "USER_ALREADY_EXISTS");

    let response = app
        .patch_json_auth("/api/v1/users/me", access, json!({ "email": EMAIL }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "NO_CHANGES_DETECTED");

    let response = app
        .patch_json_auth("/api/v1/users/me", access, json!({ "password": "short" }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");

    let response = app
        .patch_json_auth("/api/v1/users/me", access, json!({ "email": "new@example.com" }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["email"], "new@example.com");
}
