// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request validation at the route boundary.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{create_test_app, register_user, request};

#[tokio::test]
async fn test_register_rejects_invalid_email() {
    let app = create_test_app();

    let response = request(
        &app,
        Method::POST,
        "/api/register",
        None,
        Some(json!({ "email": "not-an-email", "password": "Password123" })),
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "validation_error");
    assert_eq!(response.body["details"][0]["field"], "email");
}

#[tokio::test]
async fn test_register_rejects_weak_passwords() {
    let app = create_test_app();

    for password in ["password123", "PASSWORD123", "Password", "Pass1"] {
        let response = request(
            &app,
            Method::POST,
            "/api/register",
            None,
            Some(json!({ "email": "weak@x.com", "password": password })),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", password);
        assert_eq!(response.body["details"][0]["field"], "password");
    }
}

#[tokio::test]
async fn test_register_rejects_unknown_role() {
    let app = create_test_app();

    let response = request(
        &app,
        Method::POST,
        "/api/register",
        None,
        Some(json!({ "email": "r@x.com", "password": "Password123", "role": "superuser" })),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["details"][0]["field"], "role");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_push_token_format() {
    let app = create_test_app();
    let cookie = register_user(&app, "push@x.com", "client").await;

    let response = request(
        &app,
        Method::POST,
        "/api/notifications/register",
        Some(&cookie),
        Some(json!({ "expoPushToken": "fcm:abcdef" })),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["details"][0]["field"], "expoPushToken");

    let response = request(
        &app,
        Method::POST,
        "/api/notifications/register",
        Some(&cookie),
        Some(json!({})),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_history_creation_rules() {
    let app = create_test_app();
    let cookie = register_user(&app, "hist@x.com", "client").await;

    let valid = json!({
        "vehicle": "Civic",
        "serviceType": "Full wash",
        "address": "Rua A, 1",
        "scheduledFor": "2026-11-01T10:00:00Z",
        "price": 50,
    });

    let cases = [
        ("price", json!(0)),
        ("price", json!(-5)),
        ("price", json!(1.0e9)),
        ("scheduledFor", json!("tomorrow")),
        ("vehicle", json!("")),
        ("serviceType", json!("x".repeat(101))),
        ("address", json!("x".repeat(501))),
        ("notes", json!("x".repeat(1001))),
    ];

    for (field, value) in cases {
        let mut body = valid.clone();
        body[field] = value;
        let response = request(&app, Method::POST, "/api/history", Some(&cookie), Some(body)).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", field);
        assert_eq!(response.body["details"][0]["field"], field);
    }

    // Wrong JSON type is reported against the body
    let mut body = valid.clone();
    body["price"] = json!("abc");
    let response = request(&app, Method::POST, "/api/history", Some(&cookie), Some(body)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["details"][0]["field"], "body");

    let response = request(&app, Method::POST, "/api/history", Some(&cookie), Some(valid)).await;
    assert_eq!(response.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_history_query_rules() {
    let app = create_test_app();
    let cookie = register_user(&app, "q@x.com", "client").await;

    for query in ["page=0", "page=abc", "limit=-1", "limit=1.5"] {
        let response = request(
            &app,
            Method::GET,
            &format!("/api/history?{}", query),
            Some(&cookie),
            None,
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", query);
    }

    let response = request(&app, Method::GET, "/api/history?limit=500", Some(&cookie), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["pagination"]["limit"], 100);
}

#[tokio::test]
async fn test_status_update_rejects_unknown_status() {
    let app = create_test_app();
    let cookie = register_user(&app, "s@x.com", "client").await;

    let response = request(
        &app,
        Method::PATCH,
        "/api/history/00000000-0000-0000-0000-000000000000/status",
        Some(&cookie),
        Some(json!({ "status": "done" })),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["details"][0]["field"], "status");
}

#[tokio::test]
async fn test_preferences_rules() {
    let app = create_test_app();
    let cookie = register_user(&app, "prefs@x.com", "client").await;

    for body in [
        json!({}),
        json!({ "paymentMethodLast4": "12345" }),
        json!({ "paymentMethodLast4": "abcd" }),
        json!({ "preferredVehicle": "x".repeat(201) }),
    ] {
        let response = request(
            &app,
            Method::PUT,
            "/api/account/preferences",
            Some(&cookie),
            Some(body.clone()),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", body);
    }

    let response = request(
        &app,
        Method::PUT,
        "/api/account/preferences",
        Some(&cookie),
        Some(json!({ "paymentMethodLast4": "1234" })),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["preferences"]["paymentMethodLast4"], "1234");
}
