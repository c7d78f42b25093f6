// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use lavei_server::config::Config;
use lavei_server::db::Stores;
use lavei_server::middleware::rate_limit::RateLimits;
use lavei_server::routes::create_router;
use lavei_server::services::{
    GatewayError, GoogleOAuthClient, PushDispatcher, PushGateway, PushMessage, PushTicket,
    SessionStore, SESSION_COOKIE,
};
use lavei_server::AppState;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;

/// Push gateway double: tokens containing `Gone` come back as
/// `DeviceNotRegistered`, everything else is delivered.
#[derive(Default)]
pub struct StubGateway {
    pub sent: Mutex<Vec<PushMessage>>,
}

#[async_trait]
impl PushGateway for StubGateway {
    async fn send(&self, messages: &[PushMessage]) -> Result<Vec<PushTicket>, GatewayError> {
        self.sent.lock().await.extend_from_slice(messages);
        Ok(messages
            .iter()
            .enumerate()
            .map(|(i, m)| {
                if m.to.contains("Gone") {
                    PushTicket::error("device gone", Some("DeviceNotRegistered"))
                } else {
                    PushTicket::ok(&format!("ticket-{}", i))
                }
            })
            .collect())
    }
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub gateway: Arc<StubGateway>,
}

/// Create a test app with in-memory stores and a stub push gateway.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with(Config::test_default(), None)
}

#[allow(dead_code)]
pub fn create_test_app_with(config: Config, google: Option<GoogleOAuthClient>) -> TestApp {
    let stores = Stores::in_memory();
    let gateway = Arc::new(StubGateway::default());
    let push = PushDispatcher::new(gateway.clone(), stores.push_tokens.clone());
    let sessions = SessionStore::new(&config.session_secret, config.production)
        .expect("session store");

    let state = Arc::new(AppState {
        config,
        stores,
        sessions,
        rate_limits: RateLimits::default(),
        push,
        google: google.map(Arc::new),
    });

    TestApp {
        router: create_router(state.clone()),
        state,
        gateway,
    }
}

#[allow(dead_code)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub text: String,
}

impl TestResponse {
    /// `name=value` of the session cookie set by this response.
    #[allow(dead_code)]
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter(|v| v.starts_with(&format!("{}=", SESSION_COOKIE)))
            .filter_map(|v| v.split(';').next())
            .map(str::to_string)
            .next()
    }
}

/// Send one request through the router.
#[allow(dead_code)]
pub async fn request(
    app: &TestApp,
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8_lossy(&bytes).to_string();
    let body = serde_json::from_str(&text).unwrap_or(Value::Null);

    TestResponse {
        status,
        headers,
        body,
        text,
    }
}

/// Register an account and return its session cookie.
#[allow(dead_code)]
pub async fn register_user(app: &TestApp, email: &str, role: &str) -> String {
    let response = request(
        app,
        Method::POST,
        "/api/register",
        None,
        Some(serde_json::json!({
            "email": email,
            "password": "Password123",
            "role": role,
        })),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
    response.session_cookie().expect("session cookie")
}
