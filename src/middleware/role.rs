// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Role gate, layered inside [`require_auth`](super::auth::require_auth).

use crate::error::AppError;
use crate::models::{Role, SessionUser};
use axum::{extract::Request, middleware::Next, response::Response};

/// Allow the request only if the session user's role is in `allowed`.
///
/// Use with `middleware::from_fn(|req, next| require_role(&[Role::Admin], req, next))`.
pub async fn require_role(
    allowed: &'static [Role],
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(user) = request.extensions().get::<SessionUser>() else {
        tracing::warn!(path = %request.uri().path(), "Access denied: not authenticated");
        return Err(AppError::unauthenticated());
    };

    if !allowed.contains(&user.role) {
        tracing::warn!(
            user_id = %user.id,
            role = %user.role,
            required_roles = ?allowed,
            "Access denied: insufficient permissions"
        );
        return Err(AppError::Authorization);
    }

    Ok(next.run(request).await)
}
