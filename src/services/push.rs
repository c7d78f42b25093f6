// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Push notification delivery through the Expo push gateway.
//!
//! Handles:
//! - Batch submission of messages in a single gateway call
//! - Aggregate delivered/failed counts for the HTTP caller
//! - Pruning tokens the gateway reports as permanently invalid

use crate::db::PushTokenStore;
use crate::error::AppError;
use crate::models::PushToken;
use crate::validation::NotificationInput;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Ticket error codes meaning the device will never accept messages again.
const PERMANENT_TOKEN_ERRORS: [&str; 2] = ["DeviceNotRegistered", "InvalidCredentials"];

/// One message as submitted to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub to: String,
    pub sound: &'static str,
    pub title: String,
    pub body: String,
    pub data: Value,
    pub priority: &'static str,
}

impl PushMessage {
    pub fn new(to: &str, content: &NotificationInput) -> Self {
        Self {
            to: to.to_string(),
            sound: "default",
            title: content.title.clone(),
            body: content.body.clone(),
            data: content.data.clone(),
            priority: "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TicketDetails {
    #[serde(default)]
    pub error: Option<String>,
}

/// Per-message delivery outcome, in the order the messages were sent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PushTicket {
    pub status: TicketStatus,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<TicketDetails>,
}

impl PushTicket {
    pub fn ok(id: &str) -> Self {
        Self {
            status: TicketStatus::Ok,
            id: Some(id.to_string()),
            message: None,
            details: None,
        }
    }

    pub fn error(message: &str, code: Option<&str>) -> Self {
        Self {
            status: TicketStatus::Error,
            id: None,
            message: Some(message.to_string()),
            details: Some(TicketDetails {
                error: code.map(str::to_string),
            }),
        }
    }

    /// True when the ticket says the token should be dropped.
    pub fn is_permanent_token_error(&self) -> bool {
        self.status == TicketStatus::Error
            && self
                .details
                .as_ref()
                .and_then(|d| d.error.as_deref())
                .is_some_and(|code| PERMANENT_TOKEN_ERRORS.contains(&code))
    }
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    data: Vec<PushTicket>,
}

/// The gateway call failed as a whole; nothing was delivered.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("push gateway request failed: {0}")]
    Transport(String),

    #[error("push gateway returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid push gateway response: {0}")]
    InvalidResponse(String),
}

/// External push gateway.
#[async_trait]
pub trait PushGateway: Send + Sync {
    /// Submit `messages` in one call and return one ticket per message.
    async fn send(&self, messages: &[PushMessage]) -> Result<Vec<PushTicket>, GatewayError>;
}

/// HTTP client for the Expo push API.
#[derive(Clone)]
pub struct ExpoPushClient {
    http: reqwest::Client,
    url: String,
    access_token: Option<String>,
}

impl ExpoPushClient {
    pub fn new(url: impl Into<String>, access_token: Option<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| anyhow::anyhow!("failed building push HTTP client: {}", e))?;

        Ok(Self {
            http,
            url: url.into(),
            access_token,
        })
    }
}

#[async_trait]
impl PushGateway for ExpoPushClient {
    async fn send(&self, messages: &[PushMessage]) -> Result<Vec<PushTicket>, GatewayError> {
        let mut request = self
            .http
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(messages);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status { status, body });
        }

        let parsed: PushResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        Ok(parsed.data)
    }
}

/// Aggregate result reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSummary {
    pub success: bool,
    pub sent_to: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Sends notifications and keeps the token store clean.
#[derive(Clone)]
pub struct PushDispatcher {
    gateway: Arc<dyn PushGateway>,
    tokens: Arc<dyn PushTokenStore>,
}

impl PushDispatcher {
    pub fn new(gateway: Arc<dyn PushGateway>, tokens: Arc<dyn PushTokenStore>) -> Self {
        Self { gateway, tokens }
    }

    /// Submit one batch, then delete tokens whose tickets report a permanent
    /// device error. Cleanup is best effort and never fails the call.
    pub async fn send_push_notification(
        &self,
        messages: &[PushMessage],
    ) -> Result<Vec<PushTicket>, GatewayError> {
        let tickets = self.gateway.send(messages).await?;

        if tickets.len() != messages.len() {
            tracing::warn!(
                messages = messages.len(),
                tickets = tickets.len(),
                "Push gateway returned a different number of tickets"
            );
        }

        let mut invalid = BTreeSet::new();
        for (message, ticket) in messages.iter().zip(&tickets) {
            if ticket.status != TicketStatus::Error {
                continue;
            }
            tracing::warn!(
                token = %message.to,
                error = ticket.message.as_deref().unwrap_or("unknown"),
                "Push delivery failed"
            );
            if ticket.is_permanent_token_error() {
                invalid.insert(message.to.as_str());
            }
        }

        if !invalid.is_empty() {
            tracing::info!(count = invalid.len(), "Removing invalid push tokens");
        }
        for token in invalid {
            if let Err(e) = self.tokens.remove_push_token(token).await {
                tracing::error!(error = %e, token = %token, "Failed to remove invalid push token");
            }
        }

        Ok(tickets)
    }

    /// Send `content` to every token and summarize the tickets.
    pub async fn dispatch(
        &self,
        tokens: &[PushToken],
        content: &NotificationInput,
    ) -> Result<DispatchSummary, AppError> {
        let messages: Vec<PushMessage> = tokens
            .iter()
            .map(|t| PushMessage::new(&t.expo_push_token, content))
            .collect();

        let tickets = self.send_push_notification(&messages).await?;
        let delivered = tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Ok)
            .count();
        let failed = tickets.len() - delivered;

        tracing::info!(
            sent_to = messages.len(),
            delivered,
            failed,
            "Push notifications dispatched"
        );

        Ok(DispatchSummary {
            success: true,
            sent_to: messages.len(),
            delivered,
            failed,
        })
    }
}
