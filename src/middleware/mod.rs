// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (authentication, roles, rate limiting, security).

pub mod auth;
pub mod rate_limit;
pub mod role;
pub mod security;

pub use auth::require_auth;
pub use role::require_role;
