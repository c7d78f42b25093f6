// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Server-side sessions keyed by a signed cookie.
//!
//! The cookie carries only a random session id; the data lives in process
//! memory and is lost on restart.

use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use dashmap::DashMap;
use hkdf::Hkdf;
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "lavei.sid";
pub const SESSION_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Data attached to one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionData {
    /// Set once the caller has logged in.
    pub user_id: Option<Uuid>,
    /// Anti-forgery state for an OAuth flow in progress.
    pub oauth_state: Option<String>,
    /// Deep link to open when that flow completes.
    pub oauth_redirect: Option<String>,
}

struct SessionEntry {
    data: SessionData,
    expires_at: Instant,
}

pub struct SessionStore {
    sessions: DashMap<String, SessionEntry>,
    key: Key,
    rng: SystemRandom,
    ttl: Duration,
    secure: bool,
}

impl SessionStore {
    /// Derive the cookie signing key from `secret`.
    pub fn new(secret: &str, secure: bool) -> anyhow::Result<Self> {
        Self::with_ttl(secret, secure, SESSION_TTL)
    }

    pub fn with_ttl(secret: &str, secure: bool, ttl: Duration) -> anyhow::Result<Self> {
        let mut key_material = [0u8; 64];
        Hkdf::<Sha256>::new(Some(b"lavei-session-cookie"), secret.as_bytes())
            .expand(b"cookie signing key", &mut key_material)
            .map_err(|e| anyhow::anyhow!("session key derivation failed: {}", e))?;

        Ok(Self {
            sessions: DashMap::new(),
            key: Key::from(&key_material[..]),
            rng: SystemRandom::new(),
            ttl,
            secure,
        })
    }

    fn new_session_id(&self) -> anyhow::Result<String> {
        let mut bytes = [0u8; 32];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| anyhow::anyhow!("failed to generate session id"))?;
        Ok(hex::encode(bytes))
    }

    /// Store `data` under a fresh id and return the id.
    pub fn create(&self, data: SessionData) -> anyhow::Result<String> {
        let id = self.new_session_id()?;
        self.sessions.insert(
            id.clone(),
            SessionEntry {
                data,
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(id)
    }

    /// Live session data; expired entries are dropped on read.
    pub fn get(&self, id: &str) -> Option<SessionData> {
        {
            let entry = self.sessions.get(id)?;
            if entry.expires_at > Instant::now() {
                return Some(entry.data.clone());
            }
        }
        self.sessions.remove(id);
        None
    }

    /// Replace the data of a live session. Returns false if it is gone.
    pub fn update(&self, id: &str, data: SessionData) -> bool {
        match self.sessions.get_mut(id) {
            Some(mut entry) if entry.expires_at > Instant::now() => {
                entry.data = data;
                true
            }
            _ => false,
        }
    }

    pub fn destroy(&self, id: &str) {
        self.sessions.remove(id);
    }

    /// Drop expired sessions, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.sessions.len();
        let now = Instant::now();
        self.sessions.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    // ─── Cookie transport ──────────────────────────────────────

    /// Signed cookie jar over the request headers.
    pub fn jar(&self, headers: &HeaderMap) -> SignedCookieJar {
        SignedCookieJar::from_headers(headers, self.key.clone())
    }

    /// Session id from a correctly signed cookie, if any.
    pub fn session_id(&self, headers: &HeaderMap) -> Option<String> {
        self.jar(headers)
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
    }

    /// The caller's live session as `(id, data)`.
    pub fn current(&self, headers: &HeaderMap) -> Option<(String, SessionData)> {
        let id = self.session_id(headers)?;
        let data = self.get(&id)?;
        Some((id, data))
    }

    fn cookie(&self, id: String) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, id))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(time::Duration::seconds(self.ttl.as_secs() as i64))
            .build()
    }

    /// Replace any existing session with a fresh one holding `data` and
    /// return the jar that sets its cookie.
    pub fn start(&self, headers: &HeaderMap, data: SessionData) -> anyhow::Result<SignedCookieJar> {
        let jar = self.jar(headers);
        if let Some(old) = jar.get(SESSION_COOKIE) {
            self.destroy(old.value());
        }
        let id = self.create(data)?;
        Ok(jar.add(self.cookie(id)))
    }

    /// Destroy the caller's session and return the jar that clears its cookie.
    pub fn end(&self, headers: &HeaderMap) -> SignedCookieJar {
        let jar = self.jar(headers);
        if let Some(old) = jar.get(SESSION_COOKIE) {
            self.destroy(old.value());
        }
        jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
    }
}
