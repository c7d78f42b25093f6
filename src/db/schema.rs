// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! PostgreSQL schema, applied idempotently at startup.

use super::{StoreError, StoreResult};
use deadpool_postgres::Pool;

pub async fn run_migrations(pool: &Pool) -> StoreResult<()> {
    let client = pool
        .get()
        .await
        .map_err(|e| StoreError::Database(format!("Failed to get connection: {}", e)))?;
    client.batch_execute(SCHEMA_SQL).await?;

    tracing::info!("Database schema applied");
    Ok(())
}

/// Index names referenced when mapping unique violations.
pub const USERS_EMAIL_INDEX: &str = "users_email_lower_idx";
pub const USERS_GOOGLE_ID_INDEX: &str = "users_google_id_idx";

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY,
    email VARCHAR(255) NOT NULL,
    password_hash TEXT,
    google_id VARCHAR(255),
    first_name VARCHAR(100),
    last_name VARCHAR(100),
    profile_image_url TEXT,
    role VARCHAR(16) NOT NULL DEFAULT 'client'
        CHECK (role IN ('client', 'provider', 'partner', 'admin')),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE UNIQUE INDEX IF NOT EXISTS users_email_lower_idx ON users (lower(email));
CREATE UNIQUE INDEX IF NOT EXISTS users_google_id_idx ON users (google_id);

CREATE TABLE IF NOT EXISTS push_tokens (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    expo_push_token TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (user_id, expo_push_token)
);

CREATE INDEX IF NOT EXISTS push_tokens_token_idx ON push_tokens (expo_push_token);

CREATE TABLE IF NOT EXISTS service_history (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    vehicle VARCHAR(200) NOT NULL,
    service_type VARCHAR(100) NOT NULL,
    address VARCHAR(500) NOT NULL,
    scheduled_for TIMESTAMPTZ NOT NULL,
    completed_at TIMESTAMPTZ,
    price NUMERIC(10, 2) NOT NULL,
    status VARCHAR(16) NOT NULL DEFAULT 'scheduled'
        CHECK (status IN ('scheduled', 'in_progress', 'completed', 'cancelled')),
    notes TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS service_history_user_scheduled_idx
    ON service_history (user_id, scheduled_for DESC);

CREATE TABLE IF NOT EXISTS account_preferences (
    user_id UUID PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    notifications_enabled BOOLEAN NOT NULL DEFAULT TRUE,
    email_updates BOOLEAN NOT NULL DEFAULT TRUE,
    preferred_vehicle VARCHAR(200),
    payment_method_last4 VARCHAR(4),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#;
