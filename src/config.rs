//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup. A `.env` file is honoured for local
//! development.

use std::env;

/// Placeholder secret accepted only outside production.
pub const DEV_SESSION_SECRET: &str = "dev-secret-change-in-production";

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:8081,http://localhost:5000";
const DEFAULT_REDIRECT_URIS: &str = "lavei://,exp://127.0.0.1:8081";
const DEFAULT_GOOGLE_CALLBACK: &str = "/api/auth/google/callback";
pub const DEFAULT_EXPO_PUSH_URL: &str = "https://exp.host/--/api/v2/push/send";

/// Google OAuth client credentials.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Absolute URL, or a path resolved against the request host.
    pub callback_url: String,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// `APP_ENV=production`
    pub production: bool,
    /// PostgreSQL connection string; in-memory stores when absent
    pub database_url: Option<String>,
    /// Cookie signing secret
    pub session_secret: String,
    /// CORS allow-list
    pub allowed_origins: Vec<String>,
    /// Deep links the OAuth bridge page may open. The first one is the default.
    pub allowed_redirect_uris: Vec<String>,
    pub google: Option<GoogleConfig>,
    /// Push gateway endpoint
    pub expo_push_url: String,
    /// Optional bearer credential for the push gateway
    pub expo_access_token: Option<String>,
}

impl Config {
    /// Deterministic configuration for tests: in-memory stores, no Google.
    pub fn test_default() -> Self {
        Self {
            port: 5000,
            production: false,
            database_url: None,
            session_secret: "test_session_secret_32_bytes_min!".to_string(),
            allowed_origins: split_list(DEFAULT_ALLOWED_ORIGINS),
            allowed_redirect_uris: split_list(DEFAULT_REDIRECT_URIS),
            google: None,
            expo_push_url: "http://127.0.0.1:9/push/send".to_string(),
            expo_access_token: None,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let production = env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT", raw))?,
            Err(_) => 5000,
        };

        let database_url = non_empty_var("DATABASE_URL");
        let session_secret =
            non_empty_var("SESSION_SECRET").unwrap_or_else(|| DEV_SESSION_SECRET.to_string());

        if production {
            if session_secret == DEV_SESSION_SECRET {
                return Err(ConfigError::Missing("SESSION_SECRET"));
            }
            if database_url.is_none() {
                return Err(ConfigError::Missing("DATABASE_URL"));
            }
        }

        let google = match (
            non_empty_var("GOOGLE_CLIENT_ID"),
            non_empty_var("GOOGLE_CLIENT_SECRET"),
        ) {
            (Some(client_id), Some(client_secret)) => Some(GoogleConfig {
                client_id,
                client_secret,
                callback_url: non_empty_var("GOOGLE_CALLBACK_URL")
                    .unwrap_or_else(|| DEFAULT_GOOGLE_CALLBACK.to_string()),
            }),
            _ => None,
        };

        let allowed_redirect_uris = split_list(
            &env::var("ALLOWED_REDIRECT_URIS").unwrap_or_else(|_| DEFAULT_REDIRECT_URIS.into()),
        );
        if allowed_redirect_uris.is_empty() {
            return Err(ConfigError::Invalid(
                "ALLOWED_REDIRECT_URIS",
                "empty list".to_string(),
            ));
        }

        Ok(Self {
            port,
            production,
            database_url,
            session_secret,
            allowed_origins: split_list(
                &env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.into()),
            ),
            allowed_redirect_uris,
            google,
            expo_push_url: non_empty_var("EXPO_PUSH_URL")
                .unwrap_or_else(|| DEFAULT_EXPO_PUSH_URL.to_string()),
            expo_access_token: non_empty_var("EXPO_ACCESS_TOKEN"),
        })
    }

    /// Resolve a requested deep link against the allow-list.
    ///
    /// `None` means the default (first) entry; an unknown value is rejected.
    pub fn resolve_redirect_uri(&self, candidate: Option<&str>) -> Option<String> {
        match candidate {
            None => self.allowed_redirect_uris.first().cloned(),
            Some(uri) => self
                .allowed_redirect_uris
                .iter()
                .find(|allowed| allowed.as_str() == uri)
                .cloned(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
