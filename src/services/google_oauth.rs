// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth authorization-code exchange.

use crate::config::Config;
use crate::error::AppError;
use crate::models::TokenBundle;
use serde_json::{json, Value};

/// Exchanges authorization codes for tokens at Google's token endpoint.
#[derive(Clone)]
pub struct GoogleOAuthClient {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl GoogleOAuthClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            token_url: config.google_token_url.clone(),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
        }
    }

    /// Exchange an authorization code for a token bundle.
    ///
    /// A non-2xx answer from Google is returned as `Remote` carrying
    /// Google's error body.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenBundle, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Transport {
                status: None,
                message: format!("Token exchange failed: {}", e),
            })?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or_else(|e| {
            json!({ "error": format!("Failed to parse token response: {}", e) })
        });

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Google token exchange failed");
            return Err(AppError::Remote {
                status: status.as_u16(),
                payload: body,
            });
        }

        serde_json::from_value(body.clone()).map_err(|_| AppError::Remote {
            status: status.as_u16(),
            payload: body,
        })
    }
}
