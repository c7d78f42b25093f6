// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod account;
pub mod auth;
pub mod history;
pub mod notifications;

use crate::error::AppError;
use crate::middleware::auth::require_auth;
use crate::middleware::rate_limit::general_rate_limit;
use crate::middleware::security::add_security_headers;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::http::{header, Method};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

/// Liveness check.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: format_utc_rfc3339(chrono::Utc::now()),
    })
}

async fn root() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Lavei API server is running",
    }))
}

/// Service index listing every endpoint.
async fn api_index() -> Json<Value> {
    Json(json!({
        "message": "Lavei API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "GET /api/health",
            "auth": {
                "register": "POST /api/register",
                "login": "POST /api/login",
                "logout": "POST /api/logout",
                "user": "GET /api/auth/user",
                "google": "GET /api/auth/google",
            },
            "notifications": {
                "register": "POST /api/notifications/register",
                "send": "POST /api/notifications/send",
                "broadcast": "POST /api/notifications/broadcast",
            },
            "history": {
                "list": "GET /api/history",
                "create": "POST /api/history",
                "get": "GET /api/history/:serviceId",
                "updateStatus": "PATCH /api/history/:serviceId/status",
            },
            "account": {
                "details": "GET /api/account",
                "updatePreferences": "PUT /api/account/preferences",
            },
        },
    }))
}

/// Unwrap a JSON body, turning an unreadable one into a 400.
pub(crate) fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // Native clients send no Origin header and are not subject to CORS.
    let allowed_origins = state.config.allowed_origins.clone();
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                let origin_str = origin.to_str().unwrap_or("");
                allowed_origins.iter().any(|allowed| allowed == origin_str)
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    // Public API routes (no session required)
    let public_routes = Router::new()
        .route("/api", get(api_index))
        .route("/api/health", get(health_check))
        .merge(auth::routes(state.clone()));

    // Protected routes (session required)
    let protected_routes = Router::new()
        .merge(notifications::routes(state.clone()))
        .merge(history::routes(state.clone()))
        .merge(account::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let api_routes = public_routes
        .merge(protected_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            general_rate_limit,
        ));

    Router::new()
        .route("/", get(root))
        .merge(api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
