// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account details and preferences.

use crate::error::Result;
use crate::models::{AccountPreferences, SessionUser};
use crate::validation::validate_preferences_update;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, put},
    Extension, Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use super::json_body;

/// Account routes. Session auth is applied in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/account", get(get_account))
        .route("/api/account/preferences", put(update_preferences))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/generated/")
)]
pub struct AccountResponse {
    pub user: SessionUser,
    pub preferences: AccountPreferences,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/generated/")
)]
pub struct PreferencesResponse {
    pub preferences: AccountPreferences,
}

/// The session user plus their preferences (defaults on first access).
async fn get_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<AccountResponse>> {
    let preferences = state.stores.preferences.get_preferences(user.id).await?;
    Ok(Json(AccountResponse { user, preferences }))
}

async fn update_preferences(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<PreferencesResponse>> {
    let update = validate_preferences_update(json_body(payload)?)?;
    let preferences = state
        .stores
        .preferences
        .update_preferences(user.id, &update)
        .await?;

    tracing::debug!(user_id = %user.id, "Preferences updated");
    Ok(Json(PreferencesResponse { preferences }))
}
