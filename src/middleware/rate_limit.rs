// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fixed-window rate limiting.
//!
//! Counters are process-local and keyed by client IP or user id.

use crate::error::AppError;
use crate::models::SessionUser;
use crate::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Window {
    count: u32,
    started: Instant,
}

/// One named limit: at most `limit` hits per `window` for each key.
pub struct RateLimiter {
    name: &'static str,
    limit: u32,
    window: Duration,
    message: &'static str,
    counters: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(name: &'static str, limit: u32, window: Duration, message: &'static str) -> Self {
        Self {
            name,
            limit,
            window,
            message,
            counters: DashMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Count a hit for `key`, or refuse it once the window is full.
    pub fn check(&self, key: &str) -> Result<(), AppError> {
        let now = Instant::now();
        let mut entry = self.counters.entry(key.to_string()).or_insert(Window {
            count: 0,
            started: now,
        });

        if now.duration_since(entry.started) >= self.window {
            entry.count = 0;
            entry.started = now;
        }

        if entry.count >= self.limit {
            tracing::warn!(limiter = self.name, key = %key, "Rate limit exceeded");
            return Err(AppError::RateLimited {
                message: self.message.to_string(),
                retry_after_secs: self.window.as_secs(),
            });
        }

        entry.count += 1;
        Ok(())
    }

    /// Give back a hit that should not count.
    pub fn refund(&self, key: &str) {
        if let Some(mut entry) = self.counters.get_mut(key) {
            entry.count = entry.count.saturating_sub(1);
        }
    }

    /// Drop counters whose window has passed.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.counters
            .retain(|_, entry| now.duration_since(entry.started) < self.window);
    }
}

/// Every limiter used by the router.
pub struct RateLimits {
    pub general: RateLimiter,
    pub auth: RateLimiter,
    pub notifications: RateLimiter,
    pub broadcast: RateLimiter,
    pub create_resource: RateLimiter,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            general: RateLimiter::new(
                "general",
                100,
                Duration::from_secs(60),
                "Too many requests. Please try again in a few seconds.",
            ),
            auth: RateLimiter::new(
                "auth",
                5,
                Duration::from_secs(15 * 60),
                "Too many login attempts. Please try again in 15 minutes.",
            ),
            notifications: RateLimiter::new(
                "notifications",
                10,
                Duration::from_secs(60),
                "Notification limit reached. Please try again in 1 minute.",
            ),
            broadcast: RateLimiter::new(
                "broadcast",
                5,
                Duration::from_secs(60 * 60),
                "Broadcast limit reached. Please try again in 1 hour.",
            ),
            create_resource: RateLimiter::new(
                "create_resource",
                30,
                Duration::from_secs(60),
                "Too many items created. Please try again in 1 minute.",
            ),
        }
    }
}

impl RateLimits {
    pub fn purge_expired(&self) {
        for limiter in [
            &self.general,
            &self.auth,
            &self.notifications,
            &self.broadcast,
            &self.create_resource,
        ] {
            limiter.purge_expired();
        }
    }
}

/// First `X-Forwarded-For` entry, else the socket peer, else `unknown`.
pub fn client_ip(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return forwarded.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Session user id when authenticated, client IP otherwise.
fn user_key(request: &Request) -> String {
    match request.extensions().get::<SessionUser>() {
        Some(user) => format!("user:{}", user.id),
        None => format!("ip:{}", client_ip(request)),
    }
}

pub async fn general_rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    state.rate_limits.general.check(&client_ip(&request))?;
    Ok(next.run(request).await)
}

/// Login and registration. Successful requests are refunded so only
/// failures use up the window.
pub async fn auth_rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = client_ip(&request);
    state.rate_limits.auth.check(&key)?;

    let response = next.run(request).await;
    if response.status().as_u16() < 400 {
        state.rate_limits.auth.refund(&key);
    }
    Ok(response)
}

pub async fn notifications_rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    state.rate_limits.notifications.check(&user_key(&request))?;
    Ok(next.run(request).await)
}

pub async fn broadcast_rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    state.rate_limits.broadcast.check(&user_key(&request))?;
    Ok(next.run(request).await)
}

pub async fn create_resource_rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    state.rate_limits.create_resource.check(&user_key(&request))?;
    Ok(next.run(request).await)
}
