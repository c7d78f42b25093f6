// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persistence layer.
//!
//! Four store traits cover users, push tokens, service history and account
//! preferences. Each has a map-backed implementation ([`memory`]) and a
//! PostgreSQL implementation ([`postgres`]). [`Stores::from_config`] picks the
//! backend once at startup; nothing else branches on it.

pub mod memory;
pub mod postgres;
pub mod schema;

use crate::config::Config;
use crate::models::{
    AccountPreferences, HistoryPage, NewHistoryEntry, NewUser, PageRequest, PreferencesUpdate,
    PushToken, ServiceHistoryEntry, ServiceStatus, User, UserUpdate,
};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Table names as constants.
pub mod tables {
    pub const USERS: &str = "users";
    pub const PUSH_TOKENS: &str = "push_tokens";
    pub const SERVICE_HISTORY: &str = "service_history";
    pub const ACCOUNT_PREFERENCES: &str = "account_preferences";
}

/// Messages for uniqueness violations on users.
pub const EMAIL_IN_USE: &str = "Email already in use";
pub const GOOGLE_ID_IN_USE: &str = "Google account already linked to another user";

/// Store-level failures, mapped onto HTTP errors by the caller.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} conflict: {detail}")]
    Conflict { entity: &'static str, detail: String },

    #[error("Database error: {0}")]
    Database(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Case-insensitive lookup.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_by_google_id(&self, google_id: &str) -> StoreResult<Option<User>>;

    /// Fails with `Conflict` when the email or Google id is taken.
    async fn create_user(&self, data: NewUser) -> StoreResult<User>;

    /// Merge `update` and bump `updated_at`. Fails with `NotFound` for an
    /// unknown id and `Conflict` when the new email or Google id is taken.
    async fn update_user(&self, id: Uuid, update: UserUpdate) -> StoreResult<User>;

    async fn reset(&self) -> StoreResult<()>;
}

#[async_trait]
pub trait PushTokenStore: Send + Sync {
    /// Upsert keyed by `(user_id, token)`; re-registering refreshes `updated_at`.
    async fn save_push_token(&self, user_id: Uuid, token: &str) -> StoreResult<PushToken>;

    async fn get_push_tokens_for_user(&self, user_id: Uuid) -> StoreResult<Vec<PushToken>>;

    async fn get_all_push_tokens(&self) -> StoreResult<Vec<PushToken>>;

    /// Delete every row holding `token`, whoever owns it. Returns the count.
    async fn remove_push_token(&self, token: &str) -> StoreResult<u64>;

    async fn reset(&self) -> StoreResult<()>;
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Newest `scheduled_for` first, ties by newest `created_at` then id.
    async fn get_history_for_user(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> StoreResult<HistoryPage>;

    /// New entries start `scheduled` with no `completed_at`.
    async fn add_history_entry(
        &self,
        user_id: Uuid,
        entry: NewHistoryEntry,
    ) -> StoreResult<ServiceHistoryEntry>;

    /// `Ok(None)` when the user has no such entry. Setting `completed`
    /// stamps `completed_at`; other statuses leave it alone.
    async fn update_history_status(
        &self,
        user_id: Uuid,
        entry_id: Uuid,
        status: ServiceStatus,
    ) -> StoreResult<Option<ServiceHistoryEntry>>;

    async fn get_service_by_id(
        &self,
        user_id: Uuid,
        entry_id: Uuid,
    ) -> StoreResult<Option<ServiceHistoryEntry>>;

    async fn reset(&self) -> StoreResult<()>;
}

#[async_trait]
pub trait PreferencesStore: Send + Sync {
    /// Creates and persists the default record on first access.
    async fn get_preferences(&self, user_id: Uuid) -> StoreResult<AccountPreferences>;

    /// Merge onto the existing (or default) record.
    async fn update_preferences(
        &self,
        user_id: Uuid,
        update: &PreferencesUpdate,
    ) -> StoreResult<AccountPreferences>;

    async fn reset(&self) -> StoreResult<()>;
}

/// The store set shared by all handlers.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub push_tokens: Arc<dyn PushTokenStore>,
    pub history: Arc<dyn HistoryStore>,
    pub preferences: Arc<dyn PreferencesStore>,
}

impl Stores {
    /// PostgreSQL when `DATABASE_URL` is configured, in-memory otherwise.
    pub async fn from_config(config: &Config) -> StoreResult<Self> {
        match &config.database_url {
            Some(url) => Self::postgres(url).await,
            None => {
                tracing::warn!("DATABASE_URL not set, using in-memory stores");
                Ok(Self::in_memory())
            }
        }
    }

    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(memory::MemoryUserStore::default()),
            push_tokens: Arc::new(memory::MemoryPushTokenStore::default()),
            history: Arc::new(memory::MemoryHistoryStore::default()),
            preferences: Arc::new(memory::MemoryPreferencesStore::default()),
        }
    }

    /// Connect, apply the schema, and build the PostgreSQL stores.
    pub async fn postgres(database_url: &str) -> StoreResult<Self> {
        let pool = postgres::create_pool(database_url)?;
        schema::run_migrations(&pool).await?;
        tracing::info!("Connected to PostgreSQL");

        Ok(Self {
            users: Arc::new(postgres::PgUserStore::new(pool.clone())),
            push_tokens: Arc::new(postgres::PgPushTokenStore::new(pool.clone())),
            history: Arc::new(postgres::PgHistoryStore::new(pool.clone())),
            preferences: Arc::new(postgres::PgPreferencesStore::new(pool)),
        })
    }

    /// Clear every store, dependents first.
    pub async fn reset_all(&self) -> StoreResult<()> {
        self.preferences.reset().await?;
        self.history.reset().await?;
        self.push_tokens.reset().await?;
        self.users.reset().await
    }
}
