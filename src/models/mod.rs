// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod history;
pub mod preferences;
pub mod push_token;
pub mod user;

pub use history::{HistoryPage, NewHistoryEntry, PageRequest, ServiceHistoryEntry, ServiceStatus};
pub use preferences::{AccountPreferences, PreferencesUpdate};
pub use push_token::PushToken;
pub use user::{NewUser, Role, SessionUser, User, UserUpdate};
