// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use workspace_bridge::cache::InMemoryTokenCache;
use workspace_bridge::config::Config;
use workspace_bridge::models::TokenBundle;
use workspace_bridge::routes::create_router;
use workspace_bridge::services::{
    GoogleOAuthClient, InMemorySheets, InterServiceClient, SessionStore,
};
use workspace_bridge::AppState;

/// Session id bound by `connect_session`.
#[allow(dead_code)]
pub const SESSION: &str = "test-session";

/// Test app with its in-memory backends exposed for assertions.
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub sheets: Arc<InMemorySheets>,
    pub cache: Arc<InMemoryTokenCache>,
}

/// Create a test app with offline mock dependencies.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with(config: Config) -> TestApp {
    let cache = Arc::new(InMemoryTokenCache::new());
    let sheets = Arc::new(InMemorySheets::new());

    let state = Arc::new(AppState {
        relay: InterServiceClient::new(&config, cache.clone()),
        sheets: sheets.clone(),
        sessions: SessionStore::new(),
        google_oauth: GoogleOAuthClient::new(&config),
        config,
    });

    TestApp {
        router: create_router(state.clone()),
        state,
        sheets,
        cache,
    }
}

/// Bind `SESSION` to a Google access token.
#[allow(dead_code)]
pub fn connect_session(state: &AppState) {
    state
        .sessions
        .bind(SESSION, Some("coach-1"), &TokenBundle::bearer("ya29.test"));
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ─── Stub Sibling Service ────────────────────────────────────

/// One request received by a `StubService`.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[allow(dead_code)]
impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn form(&self) -> Vec<(String, String)> {
        String::from_utf8_lossy(&self.body)
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| {
                (
                    urlencoding::decode(k).unwrap().into_owned(),
                    urlencoding::decode(v).unwrap().into_owned(),
                )
            })
            .collect()
    }
}

/// HTTP server on 127.0.0.1 that records every request and answers all
/// of them with the same canned response.
#[derive(Clone)]
pub struct StubService {
    status: StatusCode,
    content_type: &'static str,
    body: Arc<String>,
    delay: Option<Duration>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

#[allow(dead_code)]
impl StubService {
    pub fn json(status: u16, body: Value) -> Self {
        Self::new(status, "application/json", body.to_string())
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self::new(status, "text/html", body.to_string())
    }

    fn new(status: u16, content_type: &'static str, body: String) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            content_type,
            body: Arc::new(body),
            delay: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Start serving; returns the base URL.
    pub async fn spawn(&self) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().fallback(record).with_state(self.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

async fn record(
    State(stub): State<StubService>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    stub.requests.lock().unwrap().push(RecordedRequest {
        method,
        path: uri.path().to_string(),
        headers,
        body,
    });

    if let Some(delay) = stub.delay {
        tokio::time::sleep(delay).await;
    }

    (
        stub.status,
        [(header::CONTENT_TYPE, stub.content_type)],
        Body::from(stub.body.as_str().to_owned()),
    )
        .into_response()
}
