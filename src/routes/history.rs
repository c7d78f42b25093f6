// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Service history routes.

use crate::error::{AppError, Result};
use crate::middleware::rate_limit::create_resource_rate_limit;
use crate::models::{ServiceHistoryEntry, SessionUser};
use crate::validation::{validate_create_history, validate_history_query, validate_status_update};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;

use super::json_body;

const SERVICE_NOT_FOUND: &str = "Service not found";

/// History routes. Session auth is applied in routes/mod.rs.
pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/history",
            post(create_entry)
                .layer(middleware::from_fn_with_state(
                    state,
                    create_resource_rate_limit,
                ))
                .get(list_history),
        )
        .route("/api/history/{service_id}", get(get_entry))
        .route("/api/history/{service_id}/status", patch(update_status))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_pages: u64,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/generated/")
)]
pub struct HistoryResponse {
    pub services: Vec<ServiceHistoryEntry>,
    pub pagination: Pagination,
}

async fn list_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<HistoryResponse>> {
    let page = validate_history_query(&params)?;
    let result = state
        .stores
        .history
        .get_history_for_user(user.id, page)
        .await?;

    Ok(Json(HistoryResponse {
        services: result.entries,
        pagination: Pagination {
            page: page.page(),
            limit: page.limit(),
            total: result.total,
            total_pages: page.total_pages(result.total),
        },
    }))
}

async fn create_entry(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<ServiceHistoryEntry>)> {
    let entry = validate_create_history(json_body(payload)?)?;
    let created = state
        .stores
        .history
        .add_history_entry(user.id, entry)
        .await?;

    tracing::info!(user_id = %user.id, entry_id = %created.id, "Service scheduled");
    Ok((StatusCode::CREATED, Json(created)))
}

/// Ids that are not UUIDs cannot name an entry.
fn parse_service_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(SERVICE_NOT_FOUND.to_string()))
}

async fn get_entry(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Path(service_id): Path<String>,
) -> Result<Json<ServiceHistoryEntry>> {
    let service_id = parse_service_id(&service_id)?;
    state
        .stores
        .history
        .get_service_by_id(user.id, service_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(SERVICE_NOT_FOUND.to_string()))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Path(service_id): Path<String>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<ServiceHistoryEntry>> {
    let status = validate_status_update(json_body(payload)?)?;
    let service_id = parse_service_id(&service_id)?;

    let updated = state
        .stores
        .history
        .update_history_status(user.id, service_id, status)
        .await?
        .ok_or_else(|| AppError::NotFound(SERVICE_NOT_FOUND.to_string()))?;

    tracing::info!(
        user_id = %user.id,
        entry_id = %updated.id,
        status = %status.as_str(),
        "Service status updated"
    );
    Ok(Json(updated))
}
