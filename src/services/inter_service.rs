// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Inter-service client for sibling backends.
//!
//! Handles:
//! - Authenticated service-to-service calls (shared key + request id)
//! - OAuth token storage in the main platform, mirrored to a local cache
//! - Cache-first token lookup with remote fallback and cache rehydration

use crate::cache::TokenCache;
use crate::config::{Config, MAIN_PLATFORM, TEXTBEE};
use crate::error::AppError;
use crate::models::{CachedTokenRecord, TokenBundle};
use crate::time_utils::now_rfc3339;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const STORE_TOKENS_ENDPOINT: &str = "/internal/store-oauth-tokens";
const GET_TOKENS_ENDPOINT: &str = "/internal/get-oauth-tokens";
const OWNER_CONTEXT_ENDPOINT: &str = "/internal/get-coach-context";
const CONFIRMATION_SMS_ENDPOINT: &str = "/internal/send-oauth-confirmation";

/// Client for direct calls to sibling services.
#[derive(Clone)]
pub struct InterServiceClient {
    http: reqwest::Client,
    service_name: String,
    service_key: String,
    service_urls: HashMap<String, String>,
    default_timeout: Duration,
    cache: Arc<dyn TokenCache>,
}

/// Token lookup response from the main platform.
#[derive(Debug, Deserialize)]
struct StoredTokensResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    tokens: Option<TokenBundle>,
    #[serde(default)]
    email: Option<String>,
}

impl InterServiceClient {
    /// Create a client from configuration with an injected token cache.
    pub fn new(config: &Config, cache: Arc<dyn TokenCache>) -> Self {
        Self {
            http: reqwest::Client::new(),
            service_name: config.service_name.clone(),
            service_key: config.service_key.clone(),
            service_urls: config.service_urls.clone(),
            default_timeout: config.inter_service_timeout,
            cache,
        }
    }

    /// Make a direct call to another service.
    ///
    /// Every call carries a fresh `x-request-id`. Any status >= 400 is a
    /// failure regardless of body, and the body must be JSON either way.
    pub async fn call_service(
        &self,
        target_service: &str,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
        timeout: Duration,
    ) -> Result<Value, AppError> {
        let base_url = self
            .service_urls
            .get(target_service)
            .ok_or_else(|| AppError::UnknownService(target_service.to_string()))?;

        let url = format!("{}{}", base_url, endpoint);
        let request_id = Uuid::new_v4().to_string();

        tracing::info!(
            request_id = %request_id,
            from = %self.service_name,
            to = target_service,
            endpoint,
            "Inter-service call"
        );

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header("x-service-name", &self.service_name)
            .header("x-service-key", &self.service_key)
            .header("x-request-id", &request_id)
            .timeout(timeout);

        if method != Method::GET {
            if let Some(body) = body {
                request = request.json(body);
            }
        }

        let timed_out = |service: &str| {
            tracing::error!(
                request_id = %request_id,
                seconds = timeout.as_secs(),
                "Service call timeout"
            );
            AppError::Timeout {
                service: service.to_string(),
                seconds: timeout.as_secs(),
            }
        };

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => return Err(timed_out(target_service)),
            Err(e) => {
                tracing::error!(request_id = %request_id, error = %e, "Service call error");
                return Err(AppError::Transport {
                    status: None,
                    message: format!("{} unreachable: {}", target_service, e),
                });
            }
        };

        let status = response.status();
        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) if e.is_timeout() => return Err(timed_out(target_service)),
            Err(e) => {
                return Err(AppError::Remote {
                    status: status.as_u16(),
                    payload: json!({ "error": format!("Failed to read response: {}", e) }),
                })
            }
        };

        let result: Value = serde_json::from_slice(&bytes).map_err(|e| {
            tracing::error!(
                request_id = %request_id,
                status = %status,
                error = %e,
                "Service returned non-JSON body"
            );
            AppError::Remote {
                status: status.as_u16(),
                payload: json!({
                    "error": "Invalid JSON response",
                    "body": String::from_utf8_lossy(&bytes),
                }),
            }
        })?;

        if status.as_u16() >= 400 {
            tracing::error!(
                request_id = %request_id,
                status = %status,
                payload = %result,
                "Service call failed"
            );
            return Err(AppError::Remote {
                status: status.as_u16(),
                payload: result,
            });
        }

        tracing::info!(request_id = %request_id, "Service call successful");
        Ok(result)
    }

    // ─── OAuth Token Relay ───────────────────────────────────────────────────

    /// Store OAuth tokens in the main platform and mirror them locally.
    ///
    /// Remote failures propagate. The local cache is only written after the
    /// main platform confirms with `success: true`, and a cache failure is
    /// logged without failing the call.
    pub async fn store_tokens(
        &self,
        tokens: &TokenBundle,
        owner_id: &str,
        owner_email: &str,
    ) -> Result<Value, AppError> {
        tracing::info!(owner = %redact(owner_id), "Storing OAuth tokens in main platform");

        let body = json!({
            "tokens": tokens,
            "coachId": owner_id,
            "coachEmail": owner_email,
        });

        let result = self
            .call_service(
                MAIN_PLATFORM,
                STORE_TOKENS_ENDPOINT,
                Method::POST,
                Some(&body),
                self.default_timeout,
            )
            .await?;

        if result.get("success").and_then(Value::as_bool) == Some(true) {
            self.cache_tokens(owner_id, owner_email, tokens).await;
        }

        Ok(result)
    }

    /// Retrieve OAuth tokens, from the local cache if possible.
    ///
    /// Returns `Ok(None)` when neither the cache nor the main platform has
    /// tokens for this owner; callers treat that as "authentication required".
    pub async fn get_tokens(&self, owner_id: &str) -> Result<Option<TokenBundle>, AppError> {
        match self.cache.get(owner_id).await {
            Ok(Some(record)) => {
                tracing::info!(owner = %redact(owner_id), "Found cached OAuth tokens");
                return Ok(Some(record.tokens));
            }
            Ok(None) => {}
            Err(e) => tracing::error!(error = %e, "Error reading token cache"),
        }

        tracing::info!(owner = %redact(owner_id), "No cached tokens, fetching from main platform");

        let endpoint = format!(
            "{}/{}",
            GET_TOKENS_ENDPOINT,
            urlencoding::encode(owner_id)
        );
        let result = match self
            .call_service(
                MAIN_PLATFORM,
                &endpoint,
                Method::GET,
                None,
                self.default_timeout,
            )
            .await
        {
            Ok(v) => v,
            Err(AppError::Remote { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        let stored: StoredTokensResponse =
            serde_json::from_value(result.clone()).map_err(|_| AppError::Remote {
                status: 200,
                payload: result,
            })?;

        match stored {
            StoredTokensResponse {
                success: true,
                tokens: Some(tokens),
                email,
            } => {
                self.cache_tokens(owner_id, email.as_deref().unwrap_or(""), &tokens)
                    .await;
                Ok(Some(tokens))
            }
            _ => Ok(None),
        }
    }

    /// Best-effort write to the local cache.
    async fn cache_tokens(&self, owner_id: &str, owner_email: &str, tokens: &TokenBundle) {
        let record = CachedTokenRecord {
            email: owner_email.to_string(),
            tokens: tokens.clone(),
            cached_at: now_rfc3339(),
        };

        match self.cache.put(owner_id, record).await {
            Ok(()) => tracing::info!(owner = %redact(owner_id), "Cached OAuth tokens locally"),
            Err(e) => tracing::error!(error = %e, "Failed to cache tokens"),
        }
    }

    // ─── Other Sibling Calls ─────────────────────────────────────────────────

    /// Fetch an owner's profile context from the main platform.
    pub async fn get_owner_context(&self, owner_id: &str) -> Result<Value, AppError> {
        let endpoint = format!(
            "{}/{}",
            OWNER_CONTEXT_ENDPOINT,
            urlencoding::encode(owner_id)
        );
        self.call_service(
            MAIN_PLATFORM,
            &endpoint,
            Method::GET,
            None,
            self.default_timeout,
        )
        .await
    }

    /// Ask the SMS service to confirm a Google Workspace connection.
    pub async fn send_connection_sms(
        &self,
        phone_number: &str,
        owner_name: &str,
    ) -> Result<Value, AppError> {
        let body = json!({
            "phone_number": phone_number,
            "coach_name": owner_name,
            "message": format!(
                "Hi {}! Your Google Workspace is now connected to Paestro. \
                 You can access your calendar and contacts from your dashboard.",
                owner_name
            ),
        });

        self.call_service(
            TEXTBEE,
            CONFIRMATION_SMS_ENDPOINT,
            Method::POST,
            Some(&body),
            self.default_timeout,
        )
        .await
    }
}

/// Owner ids are logged by prefix only.
fn redact(owner_id: &str) -> String {
    let prefix: String = owner_id.chars().take(8).collect();
    format!("{}...", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryTokenCache;

    #[test]
    fn redact_keeps_prefix() {
        assert_eq!(redact("1ce17ea6-2d4d-4f95"), "1ce17ea6...");
        assert_eq!(redact("abc"), "abc...");
    }

    #[tokio::test]
    async fn unknown_service_is_rejected_before_any_io() {
        let client = InterServiceClient::new(
            &Config::test_default(),
            Arc::new(InMemoryTokenCache::new()),
        );

        let err = client
            .call_service(
                "billing",
                "/internal/ping",
                Method::GET,
                None,
                Duration::from_secs(1),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UnknownService(name) if name == "billing"));
    }

    #[tokio::test]
    async fn cache_hit_skips_remote() {
        // Main platform points at a closed port; a remote call would fail.
        let cache = Arc::new(InMemoryTokenCache::new());
        let client = InterServiceClient::new(&Config::test_default(), cache.clone());

        cache
            .put(
                "coach-1",
                CachedTokenRecord {
                    email: "c@x.io".to_string(),
                    tokens: TokenBundle::bearer("cached"),
                    cached_at: now_rfc3339(),
                },
            )
            .await
            .unwrap();

        let tokens = client.get_tokens("coach-1").await.unwrap().unwrap();
        assert_eq!(tokens.access_token, "cached");
    }
}
