// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Login, registration, logout and Google OAuth routes.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::SignedCookieJar;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::json_body;
use crate::error::{AppError, Result};
use crate::middleware::auth::current_user;
use crate::middleware::rate_limit::auth_rate_limit;
use crate::models::SessionUser;
use crate::services::accounts;
use crate::services::google_oauth::{generate_state, states_match};
use crate::services::{GoogleOAuthClient, SessionData};
use crate::validation::{validate_login, validate_register};
use crate::AppState;

/// Fallback deep link when the session lost its stored redirect.
const DEFAULT_APP_LINK: &str = "lavei://";

const BRIDGE_PAGE_CSP: &str =
    "default-src 'none'; script-src 'unsafe-inline'; style-src 'unsafe-inline'; frame-ancestors 'none'";

pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let auth_limit = || middleware::from_fn_with_state(state.clone(), auth_rate_limit);

    Router::new()
        .route("/api/register", post(register).layer(auth_limit()))
        .route(
            "/api/login",
            post(login).layer(auth_limit()).get(login_hint),
        )
        .route("/api/logout", post(logout))
        .route("/api/auth/user", get(auth_user))
        .route("/api/auth/google", get(google_start))
        .route("/api/auth/google/callback", get(google_callback))
        .route("/api/auth/google/failure", get(google_failure))
}

// ─── Local accounts ──────────────────────────────────────────

/// Create an account and log it in.
async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, SignedCookieJar, Json<SessionUser>)> {
    let input = validate_register(json_body(payload)?)?;
    let user = accounts::register(state.stores.users.as_ref(), input).await?;

    let jar = state.sessions.start(
        &headers,
        SessionData {
            user_id: Some(user.id),
            ..Default::default()
        },
    )?;

    Ok((StatusCode::CREATED, jar, Json(SessionUser::from(&user))))
}

async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<(SignedCookieJar, Json<SessionUser>)> {
    let input = validate_login(json_body(payload)?)?;
    let user = accounts::authenticate(state.stores.users.as_ref(), input).await?;

    let jar = state.sessions.start(
        &headers,
        SessionData {
            user_id: Some(user.id),
            ..Default::default()
        },
    )?;

    tracing::info!(user_id = %user.id, "User logged in");
    Ok((jar, Json(SessionUser::from(&user))))
}

async fn login_hint() -> AppError {
    AppError::BadRequest("Use POST /api/login with email and password".to_string())
}

async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> (SignedCookieJar, Json<Value>) {
    let jar = state.sessions.end(&headers);
    (jar, Json(json!({ "message": "Logged out" })))
}

async fn auth_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SessionUser>> {
    current_user(&state, &headers)
        .await?
        .map(Json)
        .ok_or_else(AppError::unauthenticated)
}

// ─── Google OAuth ────────────────────────────────────────────

fn google_client(state: &AppState) -> Result<&GoogleOAuthClient> {
    state
        .google
        .as_deref()
        .ok_or_else(|| AppError::NotFound("Google login is not configured".to_string()))
}

#[derive(Deserialize)]
pub struct GoogleStartParams {
    /// Deep link to open once login completes; must be allow-listed.
    #[serde(default)]
    redirect_uri: Option<String>,
}

/// Start the OAuth flow: remember state and redirect, then send the caller
/// to Google's consent page.
async fn google_start(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<GoogleStartParams>,
) -> Result<(SignedCookieJar, Redirect)> {
    let client = google_client(&state)?;

    let redirect = state
        .config
        .resolve_redirect_uri(params.redirect_uri.as_deref())
        .ok_or_else(|| AppError::BadRequest("redirect_uri not allowed".to_string()))?;

    let oauth_state = generate_state()?;
    let mut session = state
        .sessions
        .current(&headers)
        .map(|(_, data)| data)
        .unwrap_or_default();
    session.oauth_state = Some(oauth_state.clone());
    session.oauth_redirect = Some(redirect.clone());
    let jar = state.sessions.start(&headers, session)?;

    let callback_url = client.callback_url(&headers);
    tracing::info!(redirect = %redirect, "Starting Google OAuth flow");

    Ok((
        jar,
        Redirect::temporary(&client.authorization_url(&callback_url, &oauth_state)),
    ))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback: check state, exchange the code, link or create the user
/// and hand back to the app through the bridge page.
async fn google_callback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Result<impl IntoResponse> {
    let client = google_client(&state)?;

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "Google OAuth denied");
        return Err(AppError::Authentication(
            "Google authentication failed".to_string(),
        ));
    }

    let session = state
        .sessions
        .current(&headers)
        .map(|(_, data)| data)
        .unwrap_or_default();
    let state_ok = match (&session.oauth_state, &params.state) {
        (Some(expected), Some(received)) => states_match(expected, received),
        _ => false,
    };
    if !state_ok {
        tracing::warn!("OAuth callback with missing or mismatched state");
        return Err(AppError::BadRequest("Invalid OAuth state".to_string()));
    }

    let code = params
        .code
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    let callback_url = client.callback_url(&headers);
    let profile = async {
        let token = client.exchange_code(&code, &callback_url).await?;
        client.fetch_profile(&token).await
    }
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Google OAuth exchange failed");
        AppError::Authentication("Google authentication failed".to_string())
    })?;

    let user = accounts::link_google_account(state.stores.users.as_ref(), &profile).await?;

    let redirect = state
        .config
        .resolve_redirect_uri(session.oauth_redirect.as_deref())
        .unwrap_or_else(|| DEFAULT_APP_LINK.to_string());

    // Fresh session: logged in, OAuth fields cleared.
    let jar = state.sessions.start(
        &headers,
        SessionData {
            user_id: Some(user.id),
            ..Default::default()
        },
    )?;

    tracing::info!(user_id = %user.id, redirect = %redirect, "Google login completed");

    Ok((
        jar,
        [(header::CONTENT_SECURITY_POLICY, BRIDGE_PAGE_CSP)],
        Html(bridge_page(&redirect)),
    ))
}

async fn google_failure() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "success": false,
            "message": "Google authentication failed",
        })),
    )
}

/// Page that opens the app's deep link, with a manual link as fallback.
fn bridge_page(redirect: &str) -> String {
    // JSON string literal, with `<` escaped so it cannot close the script tag.
    let js_target = serde_json::to_string(redirect)
        .unwrap_or_else(|_| "\"\"".to_string())
        .replace('<', "\\u003c");
    let href = escape_html(redirect);

    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <title>Signed in - Lavei</title>
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <script>
      window.onload = function () {{
        window.location.href = {js_target};
      }};
    </script>
    <style>
      body {{
        font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Helvetica, Arial, sans-serif;
        display: flex;
        flex-direction: column;
        align-items: center;
        justify-content: center;
        height: 100vh;
        margin: 0;
        background-color: #f0b100;
        color: #071121;
      }}
      .container {{ text-align: center; padding: 20px; }}
      .btn {{
        display: inline-block;
        padding: 12px 24px;
        background-color: #071121;
        color: #ffffff;
        text-decoration: none;
        border-radius: 8px;
        margin-top: 20px;
        font-weight: bold;
      }}
    </style>
  </head>
  <body>
    <div class="container">
      <h1>Signed in!</h1>
      <p>If the app does not open automatically, tap below:</p>
      <a href="{href}" class="btn">Back to the app</a>
    </div>
  </body>
</html>
"#
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
