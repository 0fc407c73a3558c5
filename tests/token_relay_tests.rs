// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token relay tests against stub sibling services.
//!
//! These tests verify that:
//! 1. Stored tokens are served from the local cache without a remote call
//! 2. Cache misses fall back to the main platform and rehydrate the cache
//! 3. Remote failures propagate and never touch the cache
//! 4. Transport problems map to the right error variants

use reqwest::Method;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use workspace_bridge::cache::{FileTokenCache, InMemoryTokenCache, TokenCache};
use workspace_bridge::config::{Config, MAIN_PLATFORM, TEXTBEE};
use workspace_bridge::error::AppError;
use workspace_bridge::models::TokenBundle;
use workspace_bridge::services::InterServiceClient;

mod common;
use common::StubService;

fn relay_for(base_url: &str, cache: Arc<dyn TokenCache>) -> InterServiceClient {
    let config = Config::test_default().with_service_url(MAIN_PLATFORM, base_url);
    InterServiceClient::new(&config, cache)
}

fn sample_tokens() -> TokenBundle {
    TokenBundle {
        refresh_token: Some("1//refresh".to_string()),
        expires_in: Some(3599),
        ..TokenBundle::bearer("ya29.fresh")
    }
}

#[tokio::test]
async fn test_never_stored_owner_has_no_tokens() {
    let stub = StubService::json(404, json!({ "error": "No tokens for coach" }));
    let url = stub.spawn().await;
    let cache = Arc::new(InMemoryTokenCache::new());
    let relay = relay_for(&url, cache.clone());

    let tokens = relay.get_tokens("coach-unknown").await.unwrap();

    assert!(tokens.is_none());
    assert!(cache.is_empty());
    assert_eq!(stub.requests()[0].path, "/internal/get-oauth-tokens/coach-unknown");
}

#[tokio::test]
async fn test_unsuccessful_lookup_is_none() {
    let stub = StubService::json(200, json!({ "success": false }));
    let url = stub.spawn().await;
    let relay = relay_for(&url, Arc::new(InMemoryTokenCache::new()));

    assert!(relay.get_tokens("coach-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_store_then_get_is_served_from_cache() {
    let stub = StubService::json(200, json!({ "success": true, "id": "row-9" }));
    let url = stub.spawn().await;
    let cache = Arc::new(InMemoryTokenCache::new());
    let relay = relay_for(&url, cache.clone());
    let tokens = sample_tokens();

    let result = relay
        .store_tokens(&tokens, "coach-1", "coach@example.com")
        .await
        .unwrap();
    assert_eq!(result["id"], "row-9");

    let fetched = relay.get_tokens("coach-1").await.unwrap().unwrap();
    assert_eq!(fetched, tokens);

    // Only the store call reached the main platform
    assert_eq!(stub.call_count(), 1);

    let record = cache.get("coach-1").await.unwrap().unwrap();
    assert_eq!(record.email, "coach@example.com");
    assert!(record.cached_at.ends_with('Z'));
}

#[tokio::test]
async fn test_store_sends_service_headers_and_body() {
    let stub = StubService::json(200, json!({ "success": true }));
    let url = stub.spawn().await;
    let relay = relay_for(&url, Arc::new(InMemoryTokenCache::new()));

    relay
        .store_tokens(&sample_tokens(), "coach-1", "coach@example.com")
        .await
        .unwrap();
    relay
        .store_tokens(&sample_tokens(), "coach-1", "coach@example.com")
        .await
        .unwrap();

    let requests = stub.requests();
    let first = &requests[0];
    assert_eq!(first.method, Method::POST);
    assert_eq!(first.path, "/internal/store-oauth-tokens");
    assert_eq!(first.header("x-service-name"), Some("google-workspace"));
    assert_eq!(first.header("x-service-key"), Some("test_service_key"));
    assert_eq!(first.header("content-type"), Some("application/json"));

    let request_id = first.header("x-request-id").unwrap();
    assert!(uuid::Uuid::parse_str(request_id).is_ok());
    assert_ne!(requests[1].header("x-request-id"), Some(request_id));

    let body = first.json();
    assert_eq!(body["coachId"], "coach-1");
    assert_eq!(body["coachEmail"], "coach@example.com");
    assert_eq!(body["tokens"]["access_token"], "ya29.fresh");
    assert_eq!(body["tokens"]["refresh_token"], "1//refresh");
}

#[tokio::test]
async fn test_store_failure_propagates_and_leaves_cache_untouched() {
    let stub = StubService::json(500, json!({ "error": "database unavailable" }));
    let url = stub.spawn().await;
    let cache = Arc::new(InMemoryTokenCache::new());
    let relay = relay_for(&url, cache.clone());

    let err = relay
        .store_tokens(&sample_tokens(), "coach-1", "coach@example.com")
        .await
        .unwrap_err();

    match err {
        AppError::Remote { status, payload } => {
            assert_eq!(status, 500);
            assert_eq!(payload["error"], "database unavailable");
        }
        other => panic!("expected Remote, got {:?}", other),
    }
    assert!(!cache.contains("coach-1"));
}

#[tokio::test]
async fn test_store_without_success_flag_is_not_cached() {
    let stub = StubService::json(200, json!({ "success": false, "reason": "duplicate" }));
    let url = stub.spawn().await;
    let cache = Arc::new(InMemoryTokenCache::new());
    let relay = relay_for(&url, cache.clone());

    let result = relay
        .store_tokens(&sample_tokens(), "coach-1", "coach@example.com")
        .await
        .unwrap();

    assert_eq!(result["reason"], "duplicate");
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_cache_miss_rehydrates_from_remote() {
    let stub = StubService::json(
        200,
        json!({
            "success": true,
            "email": "coach@example.com",
            "tokens": { "access_token": "ya29.remote", "token_type": "Bearer" }
        }),
    );
    let url = stub.spawn().await;
    let cache = Arc::new(InMemoryTokenCache::new());
    let relay = relay_for(&url, cache.clone());

    let first = relay.get_tokens("coach-7").await.unwrap().unwrap();
    let second = relay.get_tokens("coach-7").await.unwrap().unwrap();

    assert_eq!(first.access_token, "ya29.remote");
    assert_eq!(first, second);
    assert_eq!(stub.call_count(), 1);

    let lookup = &stub.requests()[0];
    assert_eq!(lookup.method, Method::GET);
    assert!(lookup.body.is_empty());
    assert_eq!(
        cache.get("coach-7").await.unwrap().unwrap().email,
        "coach@example.com"
    );
}

#[tokio::test]
async fn test_corrupt_cache_file_behaves_as_miss() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("oauth_tokens.json");
    std::fs::write(&path, "{ this is not json").unwrap();

    let stub = StubService::json(
        200,
        json!({ "success": true, "tokens": { "access_token": "ya29.remote" } }),
    );
    let url = stub.spawn().await;
    let relay = relay_for(&url, Arc::new(FileTokenCache::new(path.clone())));

    let tokens = relay.get_tokens("coach-1").await.unwrap().unwrap();

    assert_eq!(tokens.access_token, "ya29.remote");
    assert_eq!(stub.call_count(), 1);
}

#[tokio::test]
async fn test_file_cache_survives_new_client() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/oauth_tokens.json");

    let stub = StubService::json(200, json!({ "success": true }));
    let url = stub.spawn().await;

    relay_for(&url, Arc::new(FileTokenCache::new(path.clone())))
        .store_tokens(&sample_tokens(), "coach-1", "coach@example.com")
        .await
        .unwrap();

    // A fresh client over the same file needs no remote call
    let tokens = relay_for(&url, Arc::new(FileTokenCache::new(path.clone())))
        .get_tokens("coach-1")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(tokens.access_token, "ya29.fresh");
    assert_eq!(stub.call_count(), 1);
}

#[tokio::test]
async fn test_error_status_is_remote_failure() {
    let stub = StubService::json(403, json!({ "error": "forbidden" }));
    let url = stub.spawn().await;
    let relay = relay_for(&url, Arc::new(InMemoryTokenCache::new()));

    let err = relay
        .call_service(
            MAIN_PLATFORM,
            "/internal/anything",
            Method::POST,
            Some(&json!({ "x": 1 })),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();

    assert_eq!(err.upstream_status(), Some(403));
    assert!(err.to_string().contains("forbidden"));
}

#[tokio::test]
async fn test_lookup_error_other_than_404_propagates() {
    let stub = StubService::json(500, json!({ "error": "boom" }));
    let url = stub.spawn().await;
    let relay = relay_for(&url, Arc::new(InMemoryTokenCache::new()));

    let err = relay.get_tokens("coach-1").await.unwrap_err();
    assert!(matches!(err, AppError::Remote { status: 500, .. }));
}

#[tokio::test]
async fn test_non_json_body_is_remote_failure() {
    let stub = StubService::text(200, "<html>Bad Gateway</html>");
    let url = stub.spawn().await;
    let relay = relay_for(&url, Arc::new(InMemoryTokenCache::new()));

    let err = relay
        .call_service(
            MAIN_PLATFORM,
            "/internal/ping",
            Method::GET,
            None,
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();

    match err {
        AppError::Remote { status, payload } => {
            assert_eq!(status, 200);
            assert_eq!(payload["error"], "Invalid JSON response");
            assert_eq!(payload["body"], "<html>Bad Gateway</html>");
        }
        other => panic!("expected Remote, got {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let stub = StubService::json(200, json!({ "success": true })).with_delay(Duration::from_secs(2));
    let url = stub.spawn().await;
    let relay = relay_for(&url, Arc::new(InMemoryTokenCache::new()));

    let err = relay
        .call_service(
            MAIN_PLATFORM,
            "/internal/slow",
            Method::GET,
            None,
            Duration::from_millis(200),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Timeout { ref service, .. } if service == MAIN_PLATFORM));
}

#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    // Config::test_default points every sibling at a closed port
    let relay = InterServiceClient::new(&Config::test_default(), Arc::new(InMemoryTokenCache::new()));

    let err = relay.get_owner_context("coach-1").await.unwrap_err();
    assert!(matches!(err, AppError::Transport { status: None, .. }));
}

#[tokio::test]
async fn test_owner_context_and_confirmation_sms() {
    let main = StubService::json(200, json!({ "success": true, "coach": { "name": "Dana" } }));
    let sms = StubService::json(200, json!({ "success": true, "messageId": "m-1" }));
    let config = Config::test_default()
        .with_service_url(MAIN_PLATFORM, main.spawn().await)
        .with_service_url(TEXTBEE, sms.spawn().await);
    let relay = InterServiceClient::new(&config, Arc::new(InMemoryTokenCache::new()));

    let context = relay.get_owner_context("coach 1").await.unwrap();
    assert_eq!(context["coach"]["name"], "Dana");
    assert_eq!(main.requests()[0].path, "/internal/get-coach-context/coach%201");

    let sent = relay.send_connection_sms("+15551234567", "Dana").await.unwrap();
    assert_eq!(sent["messageId"], "m-1");

    let request = &sms.requests()[0];
    assert_eq!(request.path, "/internal/send-oauth-confirmation");
    let body = request.json();
    assert_eq!(body["phone_number"], "+15551234567");
    assert_eq!(body["coach_name"], "Dana");
    assert!(body["message"].as_str().unwrap().starts_with("Hi Dana!"));
}
