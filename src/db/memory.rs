// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Map-backed stores for development and tests.
//!
//! Uniqueness rules match the PostgreSQL schema: the user store keeps
//! secondary indexes for normalized email and Google id and checks both under
//! its write lock. Read-then-write sequences spanning two calls (token upsert
//! followed by a read, OAuth linking) are not atomic across calls.

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
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

// ─── Users ─────────────────────────────────────────────────────

#[derive(Default)]
struct UserMaps {
    by_id: HashMap<Uuid, User>,
    email_index: HashMap<String, Uuid>,
    google_index: HashMap<String, Uuid>,
}

impl UserMaps {
    fn check_email(&self, email: &str, owner: Option<Uuid>) -> StoreResult<()> {
        match self.email_index.get(email) {
            Some(id) if Some(*id) != owner => Err(StoreError::Conflict {
                entity: "user",
                detail: EMAIL_IN_USE.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn check_google_id(&self, google_id: &str, owner: Option<Uuid>) -> StoreResult<()> {
        match self.google_index.get(google_id) {
            Some(id) if Some(*id) != owner => Err(StoreError::Conflict {
                entity: "user",
                detail: GOOGLE_ID_IN_USE.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    inner: RwLock<UserMaps>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let maps = self.inner.read().await;
        Ok(maps
            .email_index
            .get(&normalize_email(email))
            .and_then(|id| maps.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.by_id.get(&id).cloned())
    }

    async fn find_by_google_id(&self, google_id: &str) -> StoreResult<Option<User>> {
        let maps = self.inner.read().await;
        Ok(maps
            .google_index
            .get(google_id)
            .and_then(|id| maps.by_id.get(id))
            .cloned())
    }

    async fn create_user(&self, data: NewUser) -> StoreResult<User> {
        let mut maps = self.inner.write().await;

        let email = normalize_email(&data.email);
        maps.check_email(&email, None)?;
        if let Some(google_id) = &data.google_id {
            maps.check_google_id(google_id, None)?;
        }

        let id = data.id.unwrap_or_else(Uuid::new_v4);
        if maps.by_id.contains_key(&id) {
            return Err(StoreError::Conflict {
                entity: "user",
                detail: format!("User id {} already exists", id),
            });
        }

        let now = time_utils::now();
        let user = User {
            id,
            email: email.clone(),
            password_hash: data.password_hash,
            google_id: data.google_id,
            first_name: data.first_name,
            last_name: data.last_name,
            profile_image_url: data.profile_image_url,
            role: data.role,
            created_at: now,
            updated_at: now,
        };

        maps.email_index.insert(email, id);
        if let Some(google_id) = &user.google_id {
            maps.google_index.insert(google_id.clone(), id);
        }
        maps.by_id.insert(id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, update: UserUpdate) -> StoreResult<User> {
        let mut maps = self.inner.write().await;

        let Some(existing) = maps.by_id.get(&id).cloned() else {
            return Err(StoreError::NotFound {
                entity: "user",
                id: id.to_string(),
            });
        };

        if let Some(email) = &update.email {
            maps.check_email(&normalize_email(email), Some(id))?;
        }
        if let Some(google_id) = &update.google_id {
            maps.check_google_id(google_id, Some(id))?;
        }

        let mut user = existing.clone();
        update.apply_to(&mut user);
        user.updated_at = time_utils::now();

        if user.email != existing.email {
            maps.email_index.remove(&existing.email);
            maps.email_index.insert(user.email.clone(), id);
        }
        if user.google_id != existing.google_id {
            if let Some(old) = &existing.google_id {
                maps.google_index.remove(old);
            }
            if let Some(new) = &user.google_id {
                maps.google_index.insert(new.clone(), id);
            }
        }

        maps.by_id.insert(id, user.clone());
        Ok(user)
    }

    async fn reset(&self) -> StoreResult<()> {
        *self.inner.write().await = UserMaps::default();
        Ok(())
    }
}

// ─── Push Tokens ───────────────────────────────────────────────

/// Tokens in registration order.
#[derive(Default)]
pub struct MemoryPushTokenStore {
    tokens: RwLock<Vec<PushToken>>,
}

#[async_trait]
impl PushTokenStore for MemoryPushTokenStore {
    async fn save_push_token(&self, user_id: Uuid, token: &str) -> StoreResult<PushToken> {
        let mut tokens = self.tokens.write().await;
        let now = time_utils::now();

        if let Some(existing) = tokens
            .iter_mut()
            .find(|t| t.user_id == user_id && t.expo_push_token == token)
        {
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let record = PushToken {
            id: Uuid::new_v4(),
            user_id,
            expo_push_token: token.to_string(),
            created_at: now,
            updated_at: now,
        };
        tokens.push(record.clone());
        Ok(record)
    }

    async fn get_push_tokens_for_user(&self, user_id: Uuid) -> StoreResult<Vec<PushToken>> {
        Ok(self
            .tokens
            .read()
            .await
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_all_push_tokens(&self) -> StoreResult<Vec<PushToken>> {
        Ok(self.tokens.read().await.clone())
    }

    async fn remove_push_token(&self, token: &str) -> StoreResult<u64> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|t| t.expo_push_token != token);
        Ok((before - tokens.len()) as u64)
    }

    async fn reset(&self) -> StoreResult<()> {
        self.tokens.write().await.clear();
        Ok(())
    }
}

// ─── Service History ───────────────────────────────────────────

#[derive(Default)]
pub struct MemoryHistoryStore {
    entries: RwLock<HashMap<Uuid, ServiceHistoryEntry>>,
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn get_history_for_user(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> StoreResult<HistoryPage> {
        let entries = self.entries.read().await;

        let mut owned: Vec<&ServiceHistoryEntry> =
            entries.values().filter(|e| e.user_id == user_id).collect();
        owned.sort_by(|a, b| {
            b.scheduled_for
                .cmp(&a.scheduled_for)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = owned.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let entries = owned
            .into_iter()
            .skip(offset)
            .take(page.limit() as usize)
            .cloned()
            .collect();

        Ok(HistoryPage { entries, total })
    }

    async fn add_history_entry(
        &self,
        user_id: Uuid,
        entry: NewHistoryEntry,
    ) -> StoreResult<ServiceHistoryEntry> {
        let now = time_utils::now();
        let record = ServiceHistoryEntry {
            id: Uuid::new_v4(),
            user_id,
            vehicle: entry.vehicle,
            service_type: entry.service_type,
            address: entry.address,
            scheduled_for: entry.scheduled_for,
            completed_at: None,
            price: entry.price,
            status: ServiceStatus::Scheduled,
            notes: entry.notes,
            created_at: now,
            updated_at: now,
        };

        self.entries.write().await.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_history_status(
        &self,
        user_id: Uuid,
        entry_id: Uuid,
        status: ServiceStatus,
    ) -> StoreResult<Option<ServiceHistoryEntry>> {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries
            .get_mut(&entry_id)
            .filter(|e| e.user_id == user_id)
        else {
            return Ok(None);
        };

        let now = time_utils::now();
        entry.status = status;
        if status == ServiceStatus::Completed {
            entry.completed_at = Some(now);
        }
        entry.updated_at = now;
        Ok(Some(entry.clone()))
    }

    async fn get_service_by_id(
        &self,
        user_id: Uuid,
        entry_id: Uuid,
    ) -> StoreResult<Option<ServiceHistoryEntry>> {
        Ok(self
            .entries
            .read()
            .await
            .get(&entry_id)
            .filter(|e| e.user_id == user_id)
            .cloned())
    }

    async fn reset(&self) -> StoreResult<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}

// ─── Account Preferences ───────────────────────────────────────

#[derive(Default)]
pub struct MemoryPreferencesStore {
    records: RwLock<HashMap<Uuid, AccountPreferences>>,
}

#[async_trait]
impl PreferencesStore for MemoryPreferencesStore {
    async fn get_preferences(&self, user_id: Uuid) -> StoreResult<AccountPreferences> {
        if let Some(prefs) = self.records.read().await.get(&user_id) {
            return Ok(prefs.clone());
        }

        let mut records = self.records.write().await;
        Ok(records
            .entry(user_id)
            .or_insert_with(|| AccountPreferences::defaults(user_id, time_utils::now()))
            .clone())
    }

    async fn update_preferences(
        &self,
        user_id: Uuid,
        update: &PreferencesUpdate,
    ) -> StoreResult<AccountPreferences> {
        let mut records = self.records.write().await;
        let now = time_utils::now();
        let prefs = records
            .entry(user_id)
            .or_insert_with(|| AccountPreferences::defaults(user_id, now));
        update.apply_to(prefs, now);
        Ok(prefs.clone())
    }

    async fn reset(&self) -> StoreResult<()> {
        self.records.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::{Duration, TimeZone, Utc};

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: Some("hash".to_string()),
            ..Default::default()
        }
    }

    fn booking(days: i64) -> NewHistoryEntry {
        NewHistoryEntry {
            vehicle: "Honda Civic".to_string(),
            service_type: "Full wash".to_string(),
            address: "Rua A, 100".to_string(),
            scheduled_for: Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
                + Duration::days(days),
            price: 49.9,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_user_email_is_case_insensitive_and_unique() {
        let store = MemoryUserStore::default();
        let user = store.create_user(new_user("Ana@Example.com ")).await.unwrap();

        assert_eq!(user.email, "ana@example.com");
        assert_eq!(user.role, Role::Client);
        assert_eq!(
            store.find_by_email("ANA@EXAMPLE.COM").await.unwrap(),
            Some(user.clone())
        );

        let err = store.create_user(new_user("ana@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_google_id_unique_and_indexed_on_update() {
        let store = MemoryUserStore::default();
        let a = store.create_user(new_user("a@x.com")).await.unwrap();
        let b = store.create_user(new_user("b@x.com")).await.unwrap();

        let linked = store
            .update_user(
                a.id,
                UserUpdate {
                    google_id: Some("g-1".to_string()),
                    first_name: Some("Ana".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(linked.google_id.as_deref(), Some("g-1"));
        assert!(linked.updated_at >= a.updated_at);
        assert_eq!(store.find_by_google_id("g-1").await.unwrap().unwrap().id, a.id);

        let err = store
            .update_user(
                b.id,
                UserUpdate {
                    google_id: Some("g-1".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_update_unknown_user_is_not_found() {
        let store = MemoryUserStore::default();
        let err = store
            .update_user(Uuid::new_v4(), UserUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_push_token_upsert_is_idempotent() {
        let store = MemoryPushTokenStore::default();
        let user = Uuid::new_v4();

        let first = store
            .save_push_token(user, "ExponentPushToken[abc]")
            .await
            .unwrap();
        let second = store
            .save_push_token(user, "ExponentPushToken[abc]")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(store.get_push_tokens_for_user(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_push_token_ignores_owner() {
        let store = MemoryPushTokenStore::default();
        let token = "ExponentPushToken[shared]";
        store.save_push_token(Uuid::new_v4(), token).await.unwrap();
        store.save_push_token(Uuid::new_v4(), token).await.unwrap();
        store
            .save_push_token(Uuid::new_v4(), "ExponentPushToken[other]")
            .await
            .unwrap();

        assert_eq!(store.remove_push_token(token).await.unwrap(), 2);
        let remaining = store.get_all_push_tokens().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].expo_push_token, "ExponentPushToken[other]");
    }

    #[tokio::test]
    async fn test_history_orders_newest_scheduled_first() {
        let store = MemoryHistoryStore::default();
        let user = Uuid::new_v4();

        store.add_history_entry(user, booking(0)).await.unwrap();
        let latest = store.add_history_entry(user, booking(5)).await.unwrap();
        store.add_history_entry(user, booking(2)).await.unwrap();
        store.add_history_entry(Uuid::new_v4(), booking(9)).await.unwrap();

        let page = store
            .get_history_for_user(user, PageRequest::new(1, 10).unwrap())
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.entries[0].id, latest.id);
        assert!(page
            .entries
            .windows(2)
            .all(|w| w[0].scheduled_for >= w[1].scheduled_for));
    }

    #[tokio::test]
    async fn test_history_pages_partition_the_listing() {
        let store = MemoryHistoryStore::default();
        let user = Uuid::new_v4();
        for day in 0..3 {
            store.add_history_entry(user, booking(day)).await.unwrap();
        }

        let first = store
            .get_history_for_user(user, PageRequest::new(1, 1).unwrap())
            .await
            .unwrap();
        let second = store
            .get_history_for_user(user, PageRequest::new(2, 1).unwrap())
            .await
            .unwrap();
        let both = store
            .get_history_for_user(user, PageRequest::new(1, 2).unwrap())
            .await
            .unwrap();

        assert_ne!(first.entries[0].id, second.entries[0].id);
        assert_eq!(both.entries[0].id, first.entries[0].id);
        assert_eq!(both.entries[1].id, second.entries[0].id);
        assert_eq!(first.total, 3);
    }

    #[tokio::test]
    async fn test_status_update_stamps_completed_at_only_on_completion() {
        let store = MemoryHistoryStore::default();
        let user = Uuid::new_v4();
        let entry = store.add_history_entry(user, booking(0)).await.unwrap();
        assert_eq!(entry.status, ServiceStatus::Scheduled);
        assert!(entry.completed_at.is_none());

        let in_progress = store
            .update_history_status(user, entry.id, ServiceStatus::InProgress)
            .await
            .unwrap()
            .unwrap();
        assert!(in_progress.completed_at.is_none());

        let completed = store
            .update_history_status(user, entry.id, ServiceStatus::Completed)
            .await
            .unwrap()
            .unwrap();
        let stamped = completed.completed_at.expect("completed_at should be set");

        let reverted = store
            .update_history_status(user, entry.id, ServiceStatus::Scheduled)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reverted.status, ServiceStatus::Scheduled);
        assert_eq!(reverted.completed_at, Some(stamped));
    }

    #[tokio::test]
    async fn test_status_update_for_unknown_or_foreign_entry_is_none() {
        let store = MemoryHistoryStore::default();
        let owner = Uuid::new_v4();
        let entry = store.add_history_entry(owner, booking(0)).await.unwrap();

        let unknown = store
            .update_history_status(owner, Uuid::new_v4(), ServiceStatus::Completed)
            .await
            .unwrap();
        assert!(unknown.is_none());

        let foreign = store
            .update_history_status(Uuid::new_v4(), entry.id, ServiceStatus::Completed)
            .await
            .unwrap();
        assert!(foreign.is_none());
        assert!(store
            .get_service_by_id(owner, entry.id)
            .await
            .unwrap()
            .unwrap()
            .completed_at
            .is_none());
    }

    #[tokio::test]
    async fn test_preferences_default_then_merge() {
        let store = MemoryPreferencesStore::default();
        let user = Uuid::new_v4();

        let defaults = store.get_preferences(user).await.unwrap();
        assert!(defaults.notifications_enabled);
        assert!(defaults.email_updates);
        assert!(defaults.preferred_vehicle.is_none());

        store
            .update_preferences(
                user,
                &PreferencesUpdate {
                    notifications_enabled: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let merged = store
            .update_preferences(
                user,
                &PreferencesUpdate {
                    preferred_vehicle: Some("Fiat Uno".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(!merged.notifications_enabled);
        assert!(merged.email_updates);
        assert_eq!(merged.preferred_vehicle.as_deref(), Some("Fiat Uno"));
        assert_eq!(merged.created_at, defaults.created_at);
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let users = MemoryUserStore::default();
        users.create_user(new_user("a@x.com")).await.unwrap();
        users.reset().await.unwrap();

        assert!(users.find_by_email("a@x.com").await.unwrap().is_none());
        users.create_user(new_user("a@x.com")).await.unwrap();
    }
}
