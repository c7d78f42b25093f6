//! Registered device endpoints for push notifications.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A device token owned by one user. `(user_id, expo_push_token)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub expo_push_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
