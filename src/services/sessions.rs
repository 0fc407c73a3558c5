// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-browser Google credentials, keyed by the `session-id` header.

use crate::models::TokenBundle;
use dashmap::DashMap;
use std::sync::Arc;

/// Google credentials bound to one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    pub owner_id: Option<String>,
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// Process-local session table. Sessions are lost on restart.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, SessionCredentials>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind (or rebind) a session to a token bundle.
    pub fn bind(&self, session_id: &str, owner_id: Option<&str>, tokens: &TokenBundle) {
        self.sessions.insert(
            session_id.to_string(),
            SessionCredentials {
                owner_id: owner_id.map(str::to_string),
                access_token: tokens.access_token.clone(),
                refresh_token: tokens.refresh_token.clone(),
            },
        );
    }

    pub fn resolve(&self, session_id: &str) -> Option<SessionCredentials> {
        self.sessions.get(session_id).map(|s| s.value().clone())
    }

    pub fn remove(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
