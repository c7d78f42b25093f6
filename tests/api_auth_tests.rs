// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session authentication and CORS tests.
//!
//! These tests verify that:
//! 1. Protected routes reject requests without a valid session
//! 2. Register/login issue a session cookie that unlocks protected routes
//! 3. Logout ends the session
//! 4. CORS preflight honours the origin allow-list

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{create_test_app, register_user, request};

#[tokio::test]
async fn test_protected_routes_without_session() {
    let app = create_test_app();

    for (method, uri) in [
        (Method::GET, "/api/history"),
        (Method::POST, "/api/history"),
        (Method::GET, "/api/account"),
        (Method::PUT, "/api/account/preferences"),
        (Method::POST, "/api/notifications/register"),
        (Method::POST, "/api/notifications/send"),
        (Method::POST, "/api/notifications/broadcast"),
    ] {
        let response = request(&app, method.clone(), uri, None, Some(json!({}))).await;
        assert_eq!(
            response.status,
            StatusCode::UNAUTHORIZED,
            "{} {} should require a session",
            method,
            uri
        );
        assert_eq!(response.body["error"], "unauthenticated");
    }
}

#[tokio::test]
async fn test_forged_cookie_is_rejected() {
    let app = create_test_app();

    let response = request(
        &app,
        Method::GET,
        "/api/auth/user",
        Some("lavei.sid=not-a-signed-value"),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_login_logout_flow() {
    let app = create_test_app();
    let credentials = json!({ "email": "a@x.com", "password": "Password123" });

    // Register
    let response = request(&app, Method::POST, "/api/register", None, Some(credentials.clone())).await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["email"], "a@x.com");
    assert_eq!(response.body["role"], "client");
    assert!(response.body.get("password").is_none());
    assert!(response.body.get("passwordHash").is_none());
    let cookie = response.session_cookie().expect("register sets a session");

    // Duplicate email, any case
    let response = request(
        &app,
        Method::POST,
        "/api/register",
        None,
        Some(json!({ "email": "A@X.COM", "password": "Password123" })),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Email already in use");

    // Session from registration works
    let response = request(&app, Method::GET, "/api/auth/user", Some(&cookie), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["email"], "a@x.com");

    // Login
    let response = request(&app, Method::POST, "/api/login", None, Some(credentials)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["email"], "a@x.com");
    let login_cookie = response.session_cookie().expect("login sets a session");

    // Wrong password
    let response = request(
        &app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({ "email": "a@x.com", "password": "Wrong12345" })),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "Invalid email or password");

    // Logout ends the session
    let response = request(&app, Method::POST, "/api/logout", Some(&login_cookie), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Logged out");

    let response = request(&app, Method::GET, "/api/auth/user", Some(&login_cookie), None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_rotates_session() {
    let app = create_test_app();
    let first = register_user(&app, "rotate@x.com", "client").await;

    let response = request(
        &app,
        Method::POST,
        "/api/login",
        Some(&first),
        Some(json!({ "email": "rotate@x.com", "password": "Password123" })),
    )
    .await;
    let second = response.session_cookie().unwrap();
    assert_ne!(first, second);

    let response = request(&app, Method::GET, "/api/auth/user", Some(&first), None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    let response = request(&app, Method::GET, "/api/auth/user", Some(&second), None).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_session_for_deleted_user_is_unauthenticated() {
    let app = create_test_app();
    let cookie = register_user(&app, "gone@x.com", "client").await;

    app.state.stores.users.reset().await.unwrap();

    let response = request(&app, Method::GET, "/api/account", Some(&cookie), None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_get_login_explains_usage() {
    let app = create_test_app();
    let response = request(&app, Method::GET, "/api/login", None, None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body["message"],
        "Use POST /api/login with email and password"
    );
}

#[tokio::test]
async fn test_register_with_explicit_role() {
    let app = create_test_app();
    let response = request(
        &app,
        Method::POST,
        "/api/register",
        None,
        Some(json!({
            "email": "partner@x.com",
            "password": "Password123",
            "firstName": "  Paula ",
            "role": "partner",
        })),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["role"], "partner");
    assert_eq!(response.body["firstName"], "Paula");
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/history")
                .header(header::ORIGIN, "http://localhost:8081")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:8081"
    );
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
        "true"
    );
}

#[tokio::test]
async fn test_cors_rejects_unknown_origin() {
    let app = create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/history")
                .header(header::ORIGIN, "https://evil.example")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(!response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn test_public_routes() {
    let app = create_test_app();

    let response = request(&app, Method::GET, "/api/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    let timestamp = response.body["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());

    let response = request(&app, Method::GET, "/api", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Lavei API");
    assert_eq!(
        response.body["endpoints"]["history"]["updateStatus"],
        "PATCH /api/history/:serviceId/status"
    );

    let response = request(&app, Method::GET, "/", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_security_headers() {
    let app = create_test_app();
    let response = request(&app, Method::GET, "/api/health", None, None).await;

    assert_eq!(response.headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(response.headers[header::X_FRAME_OPTIONS], "DENY");
    assert!(response.headers.contains_key(header::CONTENT_SECURITY_POLICY));
    // Not production
    assert!(!response
        .headers
        .contains_key(header::STRICT_TRANSPORT_SECURITY));
}
