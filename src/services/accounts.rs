// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account workflows: registration, local login and Google account linking.

use crate::db::{UserStore, EMAIL_IN_USE};
use crate::error::AppError;
use crate::models::{NewUser, Role, User, UserUpdate};
use crate::services::google_oauth::GoogleProfile;
use crate::services::password::{hash_password, verify_password};
use crate::validation::{LoginInput, RegisterInput};

pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const SOCIAL_LOGIN_ONLY: &str = "This account uses social login. Please sign in with Google.";

/// Create a local account. Fails with `Conflict` when the email is taken.
pub async fn register(users: &dyn UserStore, input: RegisterInput) -> Result<User, AppError> {
    if users.find_by_email(&input.email).await?.is_some() {
        return Err(AppError::Conflict(EMAIL_IN_USE.to_string()));
    }

    let password = input.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("password hashing task failed: {}", e)))??;

    let user = users
        .create_user(NewUser {
            email: input.email,
            password_hash: Some(password_hash),
            first_name: input.first_name,
            last_name: input.last_name,
            role: input.role,
            ..Default::default()
        })
        .await?;

    tracing::info!(user_id = %user.id, role = %user.role, "User registered");
    Ok(user)
}

/// Check local credentials.
pub async fn authenticate(users: &dyn UserStore, input: LoginInput) -> Result<User, AppError> {
    let Some(user) = users.find_by_email(&input.email).await? else {
        return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
    };

    let Some(encoded) = user.password_hash.clone() else {
        return Err(AppError::Authentication(SOCIAL_LOGIN_ONLY.to_string()));
    };

    let password = input.password;
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &encoded))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("password check task failed: {}", e)))?;

    if !valid {
        tracing::warn!(user_id = %user.id, "Failed login attempt");
        return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
    }

    Ok(user)
}

/// Resolve a Google profile to a user.
///
/// A known Google id logs in directly. Otherwise an account with the same
/// email gains the Google id and any missing profile fields. Failing both, a
/// new `client` account is created.
pub async fn link_google_account(
    users: &dyn UserStore,
    profile: &GoogleProfile,
) -> Result<User, AppError> {
    let Some(email) = profile.email.as_deref().filter(|e| !e.trim().is_empty()) else {
        return Err(AppError::Authentication(
            "Google account has no email address".to_string(),
        ));
    };

    if let Some(user) = users.find_by_google_id(&profile.sub).await? {
        return Ok(user);
    }

    if let Some(existing) = users.find_by_email(email).await? {
        let update = UserUpdate {
            google_id: Some(profile.sub.clone()),
            first_name: backfill(&existing.first_name, &profile.given_name),
            last_name: backfill(&existing.last_name, &profile.family_name),
            profile_image_url: backfill(&existing.profile_image_url, &profile.picture),
            ..Default::default()
        };
        let user = users.update_user(existing.id, update).await?;
        tracing::info!(user_id = %user.id, "Linked Google account to existing user");
        return Ok(user);
    }

    let user = users
        .create_user(NewUser {
            email: email.to_string(),
            google_id: Some(profile.sub.clone()),
            first_name: profile.given_name.clone(),
            last_name: profile.family_name.clone(),
            profile_image_url: profile.picture.clone(),
            role: Role::Client,
            ..Default::default()
        })
        .await?;
    tracing::info!(user_id = %user.id, "Created user from Google login");
    Ok(user)
}

/// Only fill a field the user does not already have.
fn backfill(current: &Option<String>, incoming: &Option<String>) -> Option<String> {
    match (current, incoming) {
        (None, Some(value)) if !value.is_empty() => Some(value.clone()),
        _ => None,
    }
}
