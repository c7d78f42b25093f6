// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Per-user account preferences.

use chrono::{DateTime, Utc};
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;

/// One settings record per user, created lazily with defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct AccountPreferences {
    pub user_id: Uuid,
    pub notifications_enabled: bool,
    pub email_updates: bool,
    pub preferred_vehicle: Option<String>,
    pub payment_method_last4: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccountPreferences {
    /// Default record for a user with no stored preferences.
    pub fn defaults(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            notifications_enabled: true,
            email_updates: true,
            preferred_vehicle: None,
            payment_method_last4: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferencesUpdate {
    pub notifications_enabled: Option<bool>,
    pub email_updates: Option<bool>,
    pub preferred_vehicle: Option<String>,
    pub payment_method_last4: Option<String>,
}

impl PreferencesUpdate {
    pub fn is_empty(&self) -> bool {
        self.notifications_enabled.is_none()
            && self.email_updates.is_none()
            && self.preferred_vehicle.is_none()
            && self.payment_method_last4.is_none()
    }

    /// Merge onto `prefs` and bump `updated_at`.
    pub fn apply_to(&self, prefs: &mut AccountPreferences, now: DateTime<Utc>) {
        if let Some(enabled) = self.notifications_enabled {
            prefs.notifications_enabled = enabled;
        }
        if let Some(enabled) = self.email_updates {
            prefs.email_updates = enabled;
        }
        if let Some(vehicle) = &self.preferred_vehicle {
            prefs.preferred_vehicle = Some(vehicle.clone());
        }
        if let Some(last4) = &self.payment_method_last4 {
            prefs.payment_method_last4 = Some(last4.clone());
        }
        prefs.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_merges_fields() {
        let now = Utc::now();
        let mut prefs = AccountPreferences::defaults(Uuid::new_v4(), now);

        PreferencesUpdate {
            email_updates: Some(false),
            ..Default::default()
        }
        .apply_to(&mut prefs, now);
        PreferencesUpdate {
            payment_method_last4: Some("4242".to_string()),
            ..Default::default()
        }
        .apply_to(&mut prefs, now);

        assert!(prefs.notifications_enabled);
        assert!(!prefs.email_updates);
        assert_eq!(prefs.payment_method_last4.as_deref(), Some("4242"));
    }

    #[test]
    fn test_is_empty() {
        assert!(PreferencesUpdate::default().is_empty());
        assert!(!PreferencesUpdate {
            notifications_enabled: Some(true),
            ..Default::default()
        }
        .is_empty());
    }
}
