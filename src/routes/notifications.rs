// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Push token registration and notification sending.

use crate::error::{AppError, Result};
use crate::middleware::rate_limit::{broadcast_rate_limit, notifications_rate_limit};
use crate::middleware::require_role;
use crate::models::{Role, SessionUser};
use crate::services::DispatchSummary;
use crate::validation::{validate_broadcast, validate_push_token, validate_send_notification};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Request, State},
    middleware::{self, Next},
    routing::post,
    Extension, Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;

use super::json_body;

/// Notification routes. Session auth is applied in routes/mod.rs.
pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let notify_limit = || middleware::from_fn_with_state(state.clone(), notifications_rate_limit);

    Router::new()
        .route(
            "/api/notifications/register",
            post(register_token).layer(notify_limit()),
        )
        .route("/api/notifications/send", post(send).layer(notify_limit()))
        .route(
            "/api/notifications/broadcast",
            post(broadcast)
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    broadcast_rate_limit,
                ))
                .layer(middleware::from_fn(|req: Request, next: Next| {
                    require_role(&[Role::Admin], req, next)
                })),
        )
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTokenResponse {
    pub success: bool,
    pub token_id: Uuid,
}

async fn register_token(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<RegisterTokenResponse>> {
    let token = validate_push_token(json_body(payload)?)?;
    let saved = state.stores.push_tokens.save_push_token(user.id, &token).await?;

    tracing::info!(user_id = %user.id, token_id = %saved.id, "Registered push token");
    Ok(Json(RegisterTokenResponse {
        success: true,
        token_id: saved.id,
    }))
}

/// Notify the caller's own devices, or another user's with `targetUserId`.
async fn send(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<DispatchSummary>> {
    let content = validate_send_notification(json_body(payload)?)?;
    let target = content.target_user_id.unwrap_or(user.id);

    let tokens = state.stores.push_tokens.get_push_tokens_for_user(target).await?;
    if tokens.is_empty() {
        return Err(AppError::NotFound("No push tokens found".to_string()));
    }

    Ok(Json(state.push.dispatch(&tokens, &content).await?))
}

/// Notify every registered device. Admin only.
async fn broadcast(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<DispatchSummary>> {
    let content = validate_broadcast(json_body(payload)?)?;

    let tokens = state.stores.push_tokens.get_all_push_tokens().await?;
    if tokens.is_empty() {
        return Err(AppError::NotFound("No push tokens registered".to_string()));
    }

    tracing::info!(user_id = %user.id, devices = tokens.len(), "Broadcasting notification");
    Ok(Json(state.push.dispatch(&tokens, &content).await?))
}
