// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Lavei API Server
//!
//! Backend for the Lavei car-wash booking app: accounts, push notifications,
//! service history and account preferences.

use lavei_server::{
    config::Config,
    db::Stores,
    middleware::rate_limit::RateLimits,
    services::{ExpoPushClient, GoogleOAuthClient, PushDispatcher, SessionStore},
    AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired sessions and rate-limit windows are dropped.
const PURGE_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");

    init_logging(config.production);
    tracing::info!(
        port = config.port,
        production = config.production,
        "Starting Lavei API"
    );

    // Stores: PostgreSQL when DATABASE_URL is set, in-memory otherwise
    let stores = Stores::from_config(&config)
        .await
        .expect("Failed to initialize stores");

    let sessions = SessionStore::new(&config.session_secret, config.production)
        .expect("Failed to initialize session store");

    let gateway = ExpoPushClient::new(
        config.expo_push_url.clone(),
        config.expo_access_token.clone(),
    )
    .expect("Failed to initialize push client");
    let push = PushDispatcher::new(Arc::new(gateway), stores.push_tokens.clone());

    let google = match &config.google {
        Some(google_config) => {
            tracing::info!("Google login enabled");
            Some(Arc::new(
                GoogleOAuthClient::new(google_config).expect("Failed to initialize Google OAuth"),
            ))
        }
        None => {
            tracing::warn!("GOOGLE_CLIENT_ID/GOOGLE_CLIENT_SECRET not set, Google login disabled");
            None
        }
    };

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        stores,
        sessions,
        rate_limits: RateLimits::default(),
        push,
        google,
    });

    spawn_purge_task(state.clone());

    // Build router
    let app = lavei_server::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Periodically drop expired sessions and stale rate-limit counters.
fn spawn_purge_task(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = state.sessions.purge_expired();
            state.rate_limits.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "Purged expired sessions");
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

/// Structured JSON logs in production, readable logs in development.
///
/// `RUST_LOG` wins over `LOG_LEVEL`; both default to `lavei_server=debug,info`.
fn init_logging(production: bool) {
    let directives = std::env::var("RUST_LOG")
        .or_else(|_| std::env::var("LOG_LEVEL"))
        .unwrap_or_else(|_| "lavei_server=debug,info".to_string());
    let filter = tracing_subscriber::EnvFilter::try_new(&directives)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lavei_server=debug,info"));

    let registry = tracing_subscriber::registry().with(filter);

    if production {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_current_span(true)
                    .flatten_event(true),
            )
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    }
}
