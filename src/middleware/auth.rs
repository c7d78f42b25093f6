// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session authentication middleware.

use crate::error::AppError;
use crate::models::SessionUser;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Resolve the caller's session to a [`SessionUser`] and attach it to the
/// request extensions. Fails closed with 401.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = current_user(&state, request.headers())
        .await?
        .ok_or_else(AppError::unauthenticated)?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// The logged-in user for these request headers, if any.
///
/// A session whose user no longer exists counts as logged out.
pub async fn current_user(
    state: &AppState,
    headers: &axum::http::HeaderMap,
) -> Result<Option<SessionUser>, AppError> {
    let Some((_, session)) = state.sessions.current(headers) else {
        return Ok(None);
    };
    let Some(user_id) = session.user_id else {
        return Ok(None);
    };

    Ok(state
        .stores
        .users
        .find_by_id(user_id)
        .await?
        .as_ref()
        .map(SessionUser::from))
}
