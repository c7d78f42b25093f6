// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Lavei: backend API for the car-wash booking app.
//!
//! This crate provides user accounts (local and Google login), push
//! notification registration and delivery, the service-history ledger and
//! per-user account preferences for the React Native client.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;
pub mod validation;

use config::Config;
use db::Stores;
use middleware::rate_limit::RateLimits;
use services::{GoogleOAuthClient, PushDispatcher, SessionStore};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub stores: Stores,
    pub sessions: SessionStore,
    pub rate_limits: RateLimits,
    pub push: PushDispatcher,
    /// Present only when Google credentials are configured.
    pub google: Option<Arc<GoogleOAuthClient>>,
}
