// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod accounts;
pub mod google_oauth;
pub mod password;
pub mod push;
pub mod session;

pub use google_oauth::{GoogleOAuthClient, GoogleProfile, OAuthError};
pub use push::{
    DispatchSummary, ExpoPushClient, GatewayError, PushDispatcher, PushGateway, PushMessage,
    PushTicket,
};
pub use session::{SessionData, SessionStore, SESSION_COOKIE};
