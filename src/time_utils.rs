// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time handling.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 with millisecond precision and a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an RFC3339 / ISO-8601 date-time (offset required) into UTC.
pub fn parse_utc_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Current time truncated to microseconds, the resolution PostgreSQL keeps.
///
/// Both store backends stamp records with this so their timestamps compare
/// identically after a round-trip.
pub fn now() -> DateTime<Utc> {
    truncate_micros(Utc::now())
}

/// Drop sub-microsecond precision.
pub fn truncate_micros(date: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(date.timestamp_micros()).unwrap_or(date)
}
