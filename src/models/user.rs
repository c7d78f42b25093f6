//! User model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;

/// Coarse permission tag gating route access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Client,
    Provider,
    Partner,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Client, Role::Provider, Role::Partner, Role::Admin];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Provider => "provider",
            Role::Partner => "partner",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or(())
    }
}

/// Stored user record.
///
/// `password_hash` is absent for accounts created through Google login.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    /// Always stored lowercase
    pub email: String,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new user. `id` is generated when not supplied.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub id: Option<Uuid>,
    pub email: String,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
    pub role: Role,
}

/// Partial user update: `Some` fields replace the stored value.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
    pub role: Option<Role>,
}

impl UserUpdate {
    /// Merge onto `user`. Does not touch timestamps.
    pub fn apply_to(self, user: &mut User) {
        if let Some(email) = self.email {
            user.email = normalize_email(&email);
        }
        if let Some(hash) = self.password_hash {
            user.password_hash = Some(hash);
        }
        if let Some(google_id) = self.google_id {
            user.google_id = Some(google_id);
        }
        if let Some(first_name) = self.first_name {
            user.first_name = Some(first_name);
        }
        if let Some(last_name) = self.last_name {
            user.last_name = Some(last_name);
        }
        if let Some(url) = self.profile_image_url {
            user.profile_image_url = Some(url);
        }
        if let Some(role) = self.role {
            user.role = role;
        }
    }
}

/// Case-insensitive email key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// The user as seen by the client and attached to a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
    pub role: Role,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            profile_image_url: user.profile_image_url.clone(),
            role: user.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert!("superuser".parse::<Role>().is_err());
        assert_eq!(Role::default(), Role::Client);
    }

    #[test]
    fn test_update_only_touches_present_fields() {
        let now = Utc::now();
        let mut user = User {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            password_hash: Some("hash".to_string()),
            google_id: None,
            first_name: Some("Ana".to_string()),
            last_name: None,
            profile_image_url: None,
            role: Role::Client,
            created_at: now,
            updated_at: now,
        };

        UserUpdate {
            google_id: Some("g-1".to_string()),
            last_name: Some("Silva".to_string()),
            ..Default::default()
        }
        .apply_to(&mut user);

        assert_eq!(user.google_id.as_deref(), Some("g-1"));
        assert_eq!(user.first_name.as_deref(), Some("Ana"));
        assert_eq!(user.last_name.as_deref(), Some("Silva"));
        assert_eq!(user.password_hash.as_deref(), Some("hash"));
    }
}
