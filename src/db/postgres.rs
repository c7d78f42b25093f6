// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! PostgreSQL stores over a `deadpool-postgres` pool.
//!
//! Upserts use `INSERT … ON CONFLICT` so they are atomic here, unlike the
//! map-backed stores.

use super::schema::{USERS_EMAIL_INDEX, USERS_GOOGLE_ID_INDEX};
use super::{
    HistoryStore, PreferencesStore, PushTokenStore, StoreError, StoreResult, UserStore,
    EMAIL_IN_USE, GOOGLE_ID_IN_USE,
};
use crate::models::user::normalize_email;
use crate::models::{
    AccountPreferences, HistoryPage, NewHistoryEntry, NewUser, PageRequest, PreferencesUpdate,
    PushToken, ServiceHistoryEntry, ServiceStatus, User, UserUpdate,
};
use crate::time_utils;
use async_trait::async_trait;
use deadpool_postgres::{Config, Pool, PoolError, Runtime};
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};
use uuid::Uuid;

pub fn create_pool(database_url: &str) -> StoreResult<Pool> {
    let mut cfg = Config::new();
    cfg.url = Some(database_url.to_string());
    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| StoreError::Database(format!("Failed to create pool: {}", e)))
}

impl From<tokio_postgres::Error> for StoreError {
    fn from(err: tokio_postgres::Error) -> Self {
        if err.code() == Some(&SqlState::UNIQUE_VIOLATION) {
            let constraint = err
                .as_db_error()
                .and_then(|db| db.constraint())
                .unwrap_or_default();
            let detail = match constraint {
                USERS_EMAIL_INDEX => EMAIL_IN_USE.to_string(),
                USERS_GOOGLE_ID_INDEX => GOOGLE_ID_IN_USE.to_string(),
                other => format!("Duplicate value violates {}", other),
            };
            return StoreError::Conflict {
                entity: "record",
                detail,
            };
        }
        StoreError::Database(describe(&err))
    }
}

/// Full text of a driver error. `Display` alone only says "db error".
fn describe(err: &tokio_postgres::Error) -> String {
    match err.as_db_error() {
        Some(db) => {
            let mut text = format!("{} (SQLSTATE {})", db.message(), db.code().code());
            if let Some(detail) = db.detail() {
                text.push_str(": ");
                text.push_str(detail);
            }
            text
        }
        None => match std::error::Error::source(err) {
            Some(source) => format!("{}: {}", err, source),
            None => err.to_string(),
        },
    }
}

impl From<PoolError> for StoreError {
    fn from(err: PoolError) -> Self {
        StoreError::Database(format!("Failed to get connection: {}", err))
    }
}

// ─── Users ─────────────────────────────────────────────────────

const USER_COLUMNS: &str = "id, email, password_hash, google_id, first_name, last_name, \
                            profile_image_url, role, created_at, updated_at";

fn user_from_row(row: &Row) -> StoreResult<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        google_id: row.try_get("google_id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        profile_image_url: row.try_get("profile_image_url")?,
        role: role
            .parse()
            .map_err(|_| StoreError::Database(format!("Unknown role in users table: {}", role)))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub struct PgUserStore {
    pool: Pool,
}

impl PgUserStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn find_one(
        &self,
        filter: &str,
        param: &(dyn ToSql + Sync),
    ) -> StoreResult<Option<User>> {
        let client = self.pool.get().await?;
        let query = format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, filter);
        client
            .query_opt(query.as_str(), &[param])
            .await?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.find_one("lower(email) = $1", &normalize_email(email))
            .await
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.find_one("id = $1", &id).await
    }

    async fn find_by_google_id(&self, google_id: &str) -> StoreResult<Option<User>> {
        self.find_one("google_id = $1", &google_id).await
    }

    async fn create_user(&self, data: NewUser) -> StoreResult<User> {
        let client = self.pool.get().await?;
        let now = time_utils::now();
        let query = format!(
            "INSERT INTO users (id, email, password_hash, google_id, first_name, last_name,
                                profile_image_url, role, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
             RETURNING {}",
            USER_COLUMNS
        );
        let row = client
            .query_one(
                query.as_str(),
                &[
                    &data.id.unwrap_or_else(Uuid::new_v4),
                    &normalize_email(&data.email),
                    &data.password_hash,
                    &data.google_id,
                    &data.first_name,
                    &data.last_name,
                    &data.profile_image_url,
                    &data.role.as_str(),
                    &now,
                ],
            )
            .await?;
        user_from_row(&row)
    }

    async fn update_user(&self, id: Uuid, update: UserUpdate) -> StoreResult<User> {
        let client = self.pool.get().await?;
        let query = format!(
            "UPDATE users SET
                email = COALESCE($2, email),
                password_hash = COALESCE($3, password_hash),
                google_id = COALESCE($4, google_id),
                first_name = COALESCE($5, first_name),
                last_name = COALESCE($6, last_name),
                profile_image_url = COALESCE($7, profile_image_url),
                role = COALESCE($8, role),
                updated_at = $9
             WHERE id = $1
             RETURNING {}",
            USER_COLUMNS
        );
        let row = client
            .query_opt(
                query.as_str(),
                &[
                    &id,
                    &update.email.as_deref().map(normalize_email),
                    &update.password_hash,
                    &update.google_id,
                    &update.first_name,
                    &update.last_name,
                    &update.profile_image_url,
                    &update.role.map(|r| r.as_str()),
                    &time_utils::now(),
                ],
            )
            .await?;

        match row {
            Some(row) => user_from_row(&row),
            None => Err(StoreError::NotFound {
                entity: "user",
                id: id.to_string(),
            }),
        }
    }

    async fn reset(&self) -> StoreResult<()> {
        let client = self.pool.get().await?;
        client.execute("DELETE FROM users", &[]).await?;
        Ok(())
    }
}

// ─── Push Tokens ───────────────────────────────────────────────

const TOKEN_COLUMNS: &str = "id, user_id, expo_push_token, created_at, updated_at";

fn token_from_row(row: &Row) -> StoreResult<PushToken> {
    Ok(PushToken {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        expo_push_token: row.try_get("expo_push_token")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub struct PgPushTokenStore {
    pool: Pool,
}

impl PgPushTokenStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PushTokenStore for PgPushTokenStore {
    async fn save_push_token(&self, user_id: Uuid, token: &str) -> StoreResult<PushToken> {
        let client = self.pool.get().await?;
        let query = format!(
            "INSERT INTO push_tokens (id, user_id, expo_push_token, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $4)
             ON CONFLICT (user_id, expo_push_token) DO UPDATE SET
                updated_at = EXCLUDED.updated_at
             RETURNING {}",
            TOKEN_COLUMNS
        );
        let row = client
            .query_one(
                query.as_str(),
                &[&Uuid::new_v4(), &user_id, &token, &time_utils::now()],
            )
            .await?;
        token_from_row(&row)
    }

    async fn get_push_tokens_for_user(&self, user_id: Uuid) -> StoreResult<Vec<PushToken>> {
        let client = self.pool.get().await?;
        let query = format!(
            "SELECT {} FROM push_tokens WHERE user_id = $1 ORDER BY created_at, id",
            TOKEN_COLUMNS
        );
        client
            .query(query.as_str(), &[&user_id])
            .await?
            .iter()
            .map(token_from_row)
            .collect()
    }

    async fn get_all_push_tokens(&self) -> StoreResult<Vec<PushToken>> {
        let client = self.pool.get().await?;
        let query = format!(
            "SELECT {} FROM push_tokens ORDER BY created_at, id",
            TOKEN_COLUMNS
        );
        client
            .query(query.as_str(), &[])
            .await?
            .iter()
            .map(token_from_row)
            .collect()
    }

    async fn remove_push_token(&self, token: &str) -> StoreResult<u64> {
        let client = self.pool.get().await?;
        Ok(client
            .execute("DELETE FROM push_tokens WHERE expo_push_token = $1", &[&token])
            .await?)
    }

    async fn reset(&self) -> StoreResult<()> {
        let client = self.pool.get().await?;
        client.execute("DELETE FROM push_tokens", &[]).await?;
        Ok(())
    }
}

// ─── Service History ───────────────────────────────────────────

const HISTORY_COLUMNS: &str = "id, user_id, vehicle, service_type, address, scheduled_for, \
                               completed_at, price::FLOAT8 AS price, status, notes, \
                               created_at, updated_at";

fn entry_from_row(row: &Row) -> StoreResult<ServiceHistoryEntry> {
    let status: String = row.try_get("status")?;
    Ok(ServiceHistoryEntry {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        vehicle: row.try_get("vehicle")?,
        service_type: row.try_get("service_type")?,
        address: row.try_get("address")?,
        scheduled_for: row.try_get("scheduled_for")?,
        completed_at: row.try_get("completed_at")?,
        price: row.try_get("price")?,
        status: status.parse().map_err(|_| {
            StoreError::Database(format!("Unknown status in service_history: {}", status))
        })?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub struct PgHistoryStore {
    pool: Pool,
}

impl PgHistoryStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryStore for PgHistoryStore {
    async fn get_history_for_user(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> StoreResult<HistoryPage> {
        let client = self.pool.get().await?;
        let query = format!(
            "SELECT {} FROM service_history
             WHERE user_id = $1
             ORDER BY scheduled_for DESC, created_at DESC, id DESC
             LIMIT $2 OFFSET $3",
            HISTORY_COLUMNS
        );
        let limit = i64::from(page.limit());
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);
        let page_params: [&(dyn ToSql + Sync); 3] = [&user_id, &limit, &offset];
        let count_params: [&(dyn ToSql + Sync); 1] = [&user_id];

        let (rows, count) = tokio::try_join!(
            client.query(query.as_str(), &page_params),
            client.query_one(
                "SELECT COUNT(*) FROM service_history WHERE user_id = $1",
                &count_params,
            ),
        )?;

        let total: i64 = count.try_get(0)?;
        Ok(HistoryPage {
            entries: rows.iter().map(entry_from_row).collect::<StoreResult<_>>()?,
            total: total.max(0) as u64,
        })
    }

    async fn add_history_entry(
        &self,
        user_id: Uuid,
        entry: NewHistoryEntry,
    ) -> StoreResult<ServiceHistoryEntry> {
        let client = self.pool.get().await?;
        let query = format!(
            "INSERT INTO service_history (id, user_id, vehicle, service_type, address,
                                          scheduled_for, price, status, notes,
                                          created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7::FLOAT8, $8, $9, $10, $10)
             RETURNING {}",
            HISTORY_COLUMNS
        );
        let row = client
            .query_one(
                query.as_str(),
                &[
                    &Uuid::new_v4(),
                    &user_id,
                    &entry.vehicle,
                    &entry.service_type,
                    &entry.address,
                    &entry.scheduled_for,
                    &entry.price,
                    &ServiceStatus::Scheduled.as_str(),
                    &entry.notes,
                    &time_utils::now(),
                ],
            )
            .await?;
        entry_from_row(&row)
    }

    async fn update_history_status(
        &self,
        user_id: Uuid,
        entry_id: Uuid,
        status: ServiceStatus,
    ) -> StoreResult<Option<ServiceHistoryEntry>> {
        let client = self.pool.get().await?;
        let query = format!(
            "UPDATE service_history SET
                status = $3::TEXT,
                completed_at = CASE WHEN $3::TEXT = 'completed' THEN $4 ELSE completed_at END,
                updated_at = $4
             WHERE id = $1 AND user_id = $2
             RETURNING {}",
            HISTORY_COLUMNS
        );
        client
            .query_opt(
                query.as_str(),
                &[&entry_id, &user_id, &status.as_str(), &time_utils::now()],
            )
            .await?
            .as_ref()
            .map(entry_from_row)
            .transpose()
    }

    async fn get_service_by_id(
        &self,
        user_id: Uuid,
        entry_id: Uuid,
    ) -> StoreResult<Option<ServiceHistoryEntry>> {
        let client = self.pool.get().await?;
        let query = format!(
            "SELECT {} FROM service_history WHERE id = $1 AND user_id = $2",
            HISTORY_COLUMNS
        );
        client
            .query_opt(query.as_str(), &[&entry_id, &user_id])
            .await?
            .as_ref()
            .map(entry_from_row)
            .transpose()
    }

    async fn reset(&self) -> StoreResult<()> {
        let client = self.pool.get().await?;
        client.execute("DELETE FROM service_history", &[]).await?;
        Ok(())
    }
}

// ─── Account Preferences ───────────────────────────────────────

const PREFERENCES_COLUMNS: &str = "user_id, notifications_enabled, email_updates, \
                                   preferred_vehicle, payment_method_last4, \
                                   created_at, updated_at";

fn preferences_from_row(row: &Row) -> StoreResult<AccountPreferences> {
    Ok(AccountPreferences {
        user_id: row.try_get("user_id")?,
        notifications_enabled: row.try_get("notifications_enabled")?,
        email_updates: row.try_get("email_updates")?,
        preferred_vehicle: row.try_get("preferred_vehicle")?,
        payment_method_last4: row.try_get("payment_method_last4")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub struct PgPreferencesStore {
    pool: Pool,
}

impl PgPreferencesStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PreferencesStore for PgPreferencesStore {
    async fn get_preferences(&self, user_id: Uuid) -> StoreResult<AccountPreferences> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO account_preferences (user_id, created_at, updated_at)
                 VALUES ($1, $2, $2)
                 ON CONFLICT (user_id) DO NOTHING",
                &[&user_id, &time_utils::now()],
            )
            .await?;

        let query = format!(
            "SELECT {} FROM account_preferences WHERE user_id = $1",
            PREFERENCES_COLUMNS
        );
        let row = client.query_one(query.as_str(), &[&user_id]).await?;
        preferences_from_row(&row)
    }

    async fn update_preferences(
        &self,
        user_id: Uuid,
        update: &PreferencesUpdate,
    ) -> StoreResult<AccountPreferences> {
        let client = self.pool.get().await?;
        let query = format!(
            "INSERT INTO account_preferences (user_id, notifications_enabled, email_updates,
                                              preferred_vehicle, payment_method_last4,
                                              created_at, updated_at)
             VALUES ($1, COALESCE($2::BOOLEAN, TRUE), COALESCE($3::BOOLEAN, TRUE),
                     $4::TEXT, $5::TEXT, $6, $6)
             ON CONFLICT (user_id) DO UPDATE SET
                notifications_enabled =
                    COALESCE($2::BOOLEAN, account_preferences.notifications_enabled),
                email_updates = COALESCE($3::BOOLEAN, account_preferences.email_updates),
                preferred_vehicle = COALESCE($4::TEXT, account_preferences.preferred_vehicle),
                payment_method_last4 =
                    COALESCE($5::TEXT, account_preferences.payment_method_last4),
                updated_at = $6
             RETURNING {}",
            PREFERENCES_COLUMNS
        );
        let row = client
            .query_one(
                query.as_str(),
                &[
                    &user_id,
                    &update.notifications_enabled,
                    &update.email_updates,
                    &update.preferred_vehicle,
                    &update.payment_method_last4,
                    &time_utils::now(),
                ],
            )
            .await?;
        preferences_from_row(&row)
    }

    async fn reset(&self) -> StoreResult<()> {
        let client = self.pool.get().await?;
        client.execute("DELETE FROM account_preferences", &[]).await?;
        Ok(())
    }
}
