// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request payload validation.
//!
//! Each schema deserializes raw JSON into a payload struct, normalizes it
//! (trim, lowercase email, round price) and runs the `validator` rules. The
//! result is either a typed input or a [`ValidationFailure`] listing field
//! errors in the schema's field order. Nothing here panics on bad input.

use crate::models::history::round_price;
use crate::models::user::normalize_email;
use crate::models::{NewHistoryEntry, PageRequest, PreferencesUpdate, Role, ServiceStatus};
use crate::time_utils::{parse_utc_rfc3339, truncate_micros};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

/// One failing field. `field` uses the JSON (camelCase) name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// A rejected payload. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFailure {
    pub errors: Vec<FieldError>,
}

impl ValidationFailure {
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError {
                field: field.to_string(),
                message: message.into(),
            }],
        }
    }

    fn from_errors(errors: &ValidationErrors, order: &[&str]) -> Self {
        let mut collected: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .filter_map(|(field, errs)| {
                errs.first().map(|err| FieldError {
                    field: to_camel_case(field.as_ref()),
                    message: err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", err.code)),
                })
            })
            .collect();

        let rank = |field: &str| order.iter().position(|f| *f == field).unwrap_or(order.len());
        collected.sort_by(|a, b| {
            rank(&a.field)
                .cmp(&rank(&b.field))
                .then_with(|| a.field.cmp(&b.field))
        });

        Self { errors: collected }
    }

    /// The first failing field.
    pub fn first(&self) -> Option<&FieldError> {
        self.errors.first()
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.first() {
            Some(err) => write!(f, "{}: {}", err.field, err.message),
            None => f.write_str("Invalid request"),
        }
    }
}

impl std::error::Error for ValidationFailure {}

fn to_camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// A payload schema: deserialize, normalize, then validate.
trait Schema: DeserializeOwned + Validate {
    /// JSON field names in reporting order.
    const FIELDS: &'static [&'static str];

    fn normalize(&mut self) {}
}

fn parse<T: Schema>(raw: Value) -> Result<T, ValidationFailure> {
    let mut payload: T = serde_json::from_value(raw)
        .map_err(|e| ValidationFailure::single("body", e.to_string()))?;
    payload.normalize();
    payload
        .validate()
        .map_err(|errs| ValidationFailure::from_errors(&errs, T::FIELDS))?;
    Ok(payload)
}

fn error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

fn trim_in_place(value: &mut Option<String>) {
    if let Some(s) = value {
        *s = s.trim().to_string();
    }
}

// ─── Custom rules ──────────────────────────────────────────────

fn password_strength(password: &str) -> Result<(), ValidationError> {
    let lower = password.chars().any(|c| c.is_ascii_lowercase());
    let upper = password.chars().any(|c| c.is_ascii_uppercase());
    let digit = password.chars().any(|c| c.is_ascii_digit());
    if lower && upper && digit {
        Ok(())
    } else {
        Err(error(
            "password_strength",
            "Password must contain at least one uppercase letter, one lowercase letter and one number",
        ))
    }
}

fn known_role(role: &str) -> Result<(), ValidationError> {
    role.parse::<Role>()
        .map(|_| ())
        .map_err(|_| error("role", "Invalid user role"))
}

fn expo_token_format(token: &str) -> Result<(), ValidationError> {
    if token.starts_with("ExponentPushToken[") || token.starts_with("ExpoPushToken[") {
        Ok(())
    } else {
        Err(error("expo_push_token", "Invalid Expo push token format"))
    }
}

fn json_object(data: &Value) -> Result<(), ValidationError> {
    if data.is_object() {
        Ok(())
    } else {
        Err(error("object", "Expected a JSON object"))
    }
}

fn uuid_format(id: &str) -> Result<(), ValidationError> {
    Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|_| error("uuid", "Invalid UUID"))
}

fn iso_datetime(raw: &str) -> Result<(), ValidationError> {
    parse_utc_rfc3339(raw)
        .map(|_| ())
        .ok_or_else(|| error("datetime", "Invalid date"))
}

fn known_status(status: &str) -> Result<(), ValidationError> {
    status
        .parse::<ServiceStatus>()
        .map(|_| ())
        .map_err(|_| error("status", "Invalid status"))
}

fn four_digits(last4: &str) -> Result<(), ValidationError> {
    if last4.len() == 4 && last4.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(error("last4", "Must be exactly 4 digits"))
    }
}

// ─── Auth ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct RegisterPayload {
    #[validate(
        required(message = "Email is required"),
        email(message = "Invalid email format"),
        length(max = 255, message = "Email is too long")
    )]
    email: Option<String>,
    #[validate(
        required(message = "Password is required"),
        length(min = 8, max = 128, message = "Password must be 8 to 128 characters"),
        custom(function = "password_strength")
    )]
    password: Option<String>,
    #[validate(length(min = 1, max = 100, message = "First name must be 1 to 100 characters"))]
    first_name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Last name must be 1 to 100 characters"))]
    last_name: Option<String>,
    #[validate(custom(function = "known_role"))]
    role: Option<String>,
}

impl Schema for RegisterPayload {
    const FIELDS: &'static [&'static str] = &["email", "password", "firstName", "lastName", "role"];

    fn normalize(&mut self) {
        if let Some(email) = &mut self.email {
            *email = normalize_email(email);
        }
        trim_in_place(&mut self.first_name);
        trim_in_place(&mut self.last_name);
    }
}

/// Validated registration request.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
}

pub fn validate_register(raw: Value) -> Result<RegisterInput, ValidationFailure> {
    let payload: RegisterPayload = parse(raw)?;
    Ok(RegisterInput {
        email: payload.email.unwrap_or_default(),
        password: payload.password.unwrap_or_default(),
        first_name: payload.first_name,
        last_name: payload.last_name,
        role: payload
            .role
            .and_then(|r| r.parse().ok())
            .unwrap_or_default(),
    })
}

#[derive(Debug, Deserialize, Validate)]
struct LoginPayload {
    #[validate(
        required(message = "Email is required"),
        email(message = "Invalid email format"),
        length(max = 255, message = "Email is too long")
    )]
    email: Option<String>,
    #[validate(
        required(message = "Password is required"),
        length(min = 1, message = "Password is required")
    )]
    password: Option<String>,
}

impl Schema for LoginPayload {
    const FIELDS: &'static [&'static str] = &["email", "password"];

    fn normalize(&mut self) {
        if let Some(email) = &mut self.email {
            *email = normalize_email(email);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

pub fn validate_login(raw: Value) -> Result<LoginInput, ValidationFailure> {
    let payload: LoginPayload = parse(raw)?;
    Ok(LoginInput {
        email: payload.email.unwrap_or_default(),
        password: payload.password.unwrap_or_default(),
    })
}

// ─── Notifications ─────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct PushTokenPayload {
    #[validate(
        required(message = "Push token is required"),
        custom(function = "expo_token_format")
    )]
    expo_push_token: Option<String>,
}

impl Schema for PushTokenPayload {
    const FIELDS: &'static [&'static str] = &["expoPushToken"];
}

/// Returns the validated Expo push token.
pub fn validate_push_token(raw: Value) -> Result<String, ValidationFailure> {
    let payload: PushTokenPayload = parse(raw)?;
    Ok(payload.expo_push_token.unwrap_or_default())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct SendNotificationPayload {
    #[validate(
        required(message = "Title is required"),
        length(min = 1, max = 200, message = "Title must be 1 to 200 characters")
    )]
    title: Option<String>,
    #[validate(
        required(message = "Body is required"),
        length(min = 1, max = 1000, message = "Body must be 1 to 1000 characters")
    )]
    body: Option<String>,
    #[validate(custom(function = "json_object"))]
    data: Option<Value>,
    #[validate(custom(function = "uuid_format"))]
    target_user_id: Option<String>,
}

impl Schema for SendNotificationPayload {
    const FIELDS: &'static [&'static str] = &["title", "body", "data", "targetUserId"];
}

#[derive(Debug, Deserialize, Validate)]
struct BroadcastPayload {
    #[validate(
        required(message = "Title is required"),
        length(min = 1, max = 200, message = "Title must be 1 to 200 characters")
    )]
    title: Option<String>,
    #[validate(
        required(message = "Body is required"),
        length(min = 1, max = 1000, message = "Body must be 1 to 1000 characters")
    )]
    body: Option<String>,
    #[validate(custom(function = "json_object"))]
    data: Option<Value>,
}

impl Schema for BroadcastPayload {
    const FIELDS: &'static [&'static str] = &["title", "body", "data"];
}

/// Validated notification content. `data` is always a JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationInput {
    pub title: String,
    pub body: String,
    pub data: Value,
    pub target_user_id: Option<Uuid>,
}

pub fn validate_send_notification(raw: Value) -> Result<NotificationInput, ValidationFailure> {
    let payload: SendNotificationPayload = parse(raw)?;
    Ok(NotificationInput {
        title: payload.title.unwrap_or_default(),
        body: payload.body.unwrap_or_default(),
        data: payload.data.unwrap_or_else(|| Value::Object(Default::default())),
        target_user_id: payload
            .target_user_id
            .and_then(|id| Uuid::parse_str(&id).ok()),
    })
}

pub fn validate_broadcast(raw: Value) -> Result<NotificationInput, ValidationFailure> {
    let payload: BroadcastPayload = parse(raw)?;
    Ok(NotificationInput {
        title: payload.title.unwrap_or_default(),
        body: payload.body.unwrap_or_default(),
        data: payload.data.unwrap_or_else(|| Value::Object(Default::default())),
        target_user_id: None,
    })
}

// ─── History ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateHistoryPayload {
    #[validate(
        required(message = "Vehicle is required"),
        length(min = 1, max = 200, message = "Vehicle must be 1 to 200 characters")
    )]
    vehicle: Option<String>,
    #[validate(
        required(message = "Service type is required"),
        length(min = 1, max = 100, message = "Service type must be 1 to 100 characters")
    )]
    service_type: Option<String>,
    #[validate(
        required(message = "Address is required"),
        length(min = 1, max = 500, message = "Address must be 1 to 500 characters")
    )]
    address: Option<String>,
    #[validate(
        required(message = "Scheduled date is required"),
        custom(function = "iso_datetime")
    )]
    scheduled_for: Option<String>,
    #[validate(
        required(message = "Price is required"),
        range(
            exclusive_min = 0.0,
            max = 99_999_999.99,
            message = "Price must be positive and at most 99999999.99"
        )
    )]
    price: Option<f64>,
    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    notes: Option<String>,
}

impl Schema for CreateHistoryPayload {
    const FIELDS: &'static [&'static str] = &[
        "vehicle",
        "serviceType",
        "address",
        "scheduledFor",
        "price",
        "notes",
    ];

    fn normalize(&mut self) {
        self.price = self.price.filter(|p| p.is_finite()).map(round_price);
    }
}

pub fn validate_create_history(raw: Value) -> Result<NewHistoryEntry, ValidationFailure> {
    let payload: CreateHistoryPayload = parse(raw)?;
    let scheduled_for = payload
        .scheduled_for
        .as_deref()
        .and_then(parse_utc_rfc3339)
        .map(truncate_micros)
        .ok_or_else(|| ValidationFailure::single("scheduledFor", "Invalid date"))?;

    Ok(NewHistoryEntry {
        vehicle: payload.vehicle.unwrap_or_default(),
        service_type: payload.service_type.unwrap_or_default(),
        address: payload.address.unwrap_or_default(),
        scheduled_for,
        price: payload.price.unwrap_or_default(),
        notes: payload.notes,
    })
}

#[derive(Debug, Deserialize, Validate)]
struct StatusPayload {
    #[validate(required(message = "Status is required"), custom(function = "known_status"))]
    status: Option<String>,
}

impl Schema for StatusPayload {
    const FIELDS: &'static [&'static str] = &["status"];
}

pub fn validate_status_update(raw: Value) -> Result<ServiceStatus, ValidationFailure> {
    let payload: StatusPayload = parse(raw)?;
    payload
        .status
        .as_deref()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ValidationFailure::single("status", "Invalid status"))
}

/// Coerce `page` and `limit` query parameters. Limits above the maximum
/// are capped rather than rejected.
pub fn validate_history_query(
    params: &HashMap<String, String>,
) -> Result<PageRequest, ValidationFailure> {
    let defaults = PageRequest::default();
    let mut errors = Vec::new();

    let mut coerce = |name: &str, default: u32| -> u32 {
        match params.get(name).map(|raw| positive_integer(raw)) {
            None => default,
            Some(Some(value)) => value,
            Some(None) => {
                errors.push(FieldError {
                    field: name.to_string(),
                    message: "Expected a positive integer".to_string(),
                });
                default
            }
        }
    };
    let page = coerce("page", defaults.page());
    let limit = coerce("limit", defaults.limit());

    if !errors.is_empty() {
        return Err(ValidationFailure { errors });
    }
    PageRequest::new(page, limit)
        .ok_or_else(|| ValidationFailure::single("page", "Expected a positive integer"))
}

fn positive_integer(raw: &str) -> Option<u32> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() || value.fract() != 0.0 || value < 1.0 {
        return None;
    }
    Some(value.min(f64::from(u32::MAX)) as u32)
}

// ─── Preferences ───────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct PreferencesPayload {
    notifications_enabled: Option<bool>,
    email_updates: Option<bool>,
    #[validate(length(max = 200, message = "Preferred vehicle must be at most 200 characters"))]
    preferred_vehicle: Option<String>,
    #[validate(custom(function = "four_digits"))]
    payment_method_last4: Option<String>,
}

impl Schema for PreferencesPayload {
    const FIELDS: &'static [&'static str] = &[
        "notificationsEnabled",
        "emailUpdates",
        "preferredVehicle",
        "paymentMethodLast4",
    ];
}

pub fn validate_preferences_update(raw: Value) -> Result<PreferencesUpdate, ValidationFailure> {
    let payload: PreferencesPayload = parse(raw)?;
    let update = PreferencesUpdate {
        notifications_enabled: payload.notifications_enabled,
        email_updates: payload.email_updates,
        preferred_vehicle: payload.preferred_vehicle,
        payment_method_last4: payload.payment_method_last4,
    };
    if update.is_empty() {
        return Err(ValidationFailure::single(
            "body",
            "At least one field must be provided",
        ));
    }
    Ok(update)
}
