// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Service history ledger through the HTTP API.

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

mod common;
use common::{create_test_app, register_user, request, TestApp};

async fn create_entry(app: &TestApp, cookie: &str, vehicle: &str, scheduled_for: &str) -> Value {
    let response = request(
        app,
        Method::POST,
        "/api/history",
        Some(cookie),
        Some(json!({
            "vehicle": vehicle,
            "serviceType": "Full wash",
            "address": "Rua das Flores, 100",
            "scheduledFor": scheduled_for,
            "price": 40,
        })),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
    response.body
}

#[tokio::test]
async fn test_create_complete_and_list() {
    let app = create_test_app();
    let cookie = register_user(&app, "a@x.com", "client").await;

    let response = request(
        &app,
        Method::POST,
        "/api/history",
        Some(&cookie),
        Some(json!({
            "vehicle": "Corolla",
            "serviceType": "Premium wash",
            "address": "Av. Paulista, 1000",
            "scheduledFor": "2026-11-02T14:30:00Z",
            "price": 99.99,
            "notes": "Gate code 42",
        })),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["price"], 99.99);
    assert_eq!(response.body["status"], "scheduled");
    assert!(response.body["completedAt"].is_null());
    let id = response.body["id"].as_str().unwrap().to_string();

    let response = request(
        &app,
        Method::PATCH,
        &format!("/api/history/{}/status", id),
        Some(&cookie),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "completed");
    assert!(!response.body["completedAt"].is_null());

    let response = request(&app, Method::GET, "/api/history?page=1", Some(&cookie), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["services"][0]["id"], id.as_str());
    assert_eq!(response.body["services"][0]["status"], "completed");
    assert_eq!(
        response.body["pagination"],
        json!({ "page": 1, "limit": 20, "total": 1, "totalPages": 1 })
    );

    let response = request(
        &app,
        Method::GET,
        &format!("/api/history/{}", id),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["notes"], "Gate code 42");
}

#[tokio::test]
async fn test_status_back_to_scheduled_keeps_completed_at() {
    let app = create_test_app();
    let cookie = register_user(&app, "a@x.com", "client").await;
    let entry = create_entry(&app, &cookie, "Civic", "2026-11-01T10:00:00Z").await;
    let uri = format!("/api/history/{}/status", entry["id"].as_str().unwrap());

    let completed = request(&app, Method::PATCH, &uri, Some(&cookie), Some(json!({ "status": "completed" }))).await;
    let reopened = request(&app, Method::PATCH, &uri, Some(&cookie), Some(json!({ "status": "scheduled" }))).await;

    assert_eq!(reopened.status, StatusCode::OK);
    assert_eq!(reopened.body["status"], "scheduled");
    assert_eq!(reopened.body["completedAt"], completed.body["completedAt"]);
}

#[tokio::test]
async fn test_newest_scheduled_first_and_pagination() {
    let app = create_test_app();
    let cookie = register_user(&app, "a@x.com", "client").await;

    create_entry(&app, &cookie, "Old", "2026-10-01T09:00:00Z").await;
    create_entry(&app, &cookie, "Newest", "2026-12-01T09:00:00Z").await;
    create_entry(&app, &cookie, "Middle", "2026-11-01T09:00:00-03:00").await;

    let all = request(&app, Method::GET, "/api/history?page=1&limit=3", Some(&cookie), None).await;
    let vehicles: Vec<&str> = all.body["services"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["vehicle"].as_str().unwrap())
        .collect();
    assert_eq!(vehicles, vec!["Newest", "Middle", "Old"]);

    let first = request(&app, Method::GET, "/api/history?page=1&limit=1", Some(&cookie), None).await;
    let second = request(&app, Method::GET, "/api/history?page=2&limit=1", Some(&cookie), None).await;
    assert_eq!(first.body["services"][0]["id"], all.body["services"][0]["id"]);
    assert_eq!(second.body["services"][0]["id"], all.body["services"][1]["id"]);
    assert_eq!(first.body["pagination"]["total"], 3);
    assert_eq!(first.body["pagination"]["totalPages"], 3);

    let past_end = request(&app, Method::GET, "/api/history?page=9&limit=1", Some(&cookie), None).await;
    assert_eq!(past_end.status, StatusCode::OK);
    assert_eq!(past_end.body["services"], json!([]));
    assert_eq!(past_end.body["pagination"]["total"], 3);
}

#[tokio::test]
async fn test_entries_are_private_to_their_owner() {
    let app = create_test_app();
    let owner = register_user(&app, "owner@x.com", "client").await;
    let other = register_user(&app, "other@x.com", "client").await;
    let entry = create_entry(&app, &owner, "Civic", "2026-11-01T10:00:00Z").await;
    let id = entry["id"].as_str().unwrap();

    let response = request(&app, Method::GET, "/api/history", Some(&other), None).await;
    assert_eq!(response.body["services"], json!([]));
    assert_eq!(response.body["pagination"]["totalPages"], 0);

    let response = request(
        &app,
        Method::PATCH,
        &format!("/api/history/{}/status", id),
        Some(&other),
        Some(json!({ "status": "cancelled" })),
    )
    .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["message"], "Service not found");

    let response = request(&app, Method::GET, &format!("/api/history/{}", id), Some(&other), None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_or_malformed_service_id() {
    let app = create_test_app();
    let cookie = register_user(&app, "a@x.com", "client").await;

    for id in ["8a6e0804-2bd0-4672-b79d-d97027f9071a", "not-a-uuid"] {
        let response = request(
            &app,
            Method::PATCH,
            &format!("/api/history/{}/status", id),
            Some(&cookie),
            Some(json!({ "status": "completed" })),
        )
        .await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{}", id);
    }
}
