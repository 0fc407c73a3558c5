// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! The shared service key and Google OAuth client secret are read once at
//! startup and kept in memory.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Sibling service holding the authoritative token store.
pub const MAIN_PLATFORM: &str = "main-platform";
/// Sibling service that fronts the dashboard.
pub const ORCHESTRATOR: &str = "orchestrator";
/// Sibling service that sends SMS.
pub const TEXTBEE: &str = "textbee";

const DEFAULT_TOKEN_CACHE_PATH: &str = "/tmp/google-workspace-mcp-cache/oauth_tokens.json";
const DEFAULT_GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Server port
    pub port: u16,
    /// Name this service announces in `x-service-name`
    pub service_name: String,
    /// Base URLs of sibling services, keyed by service name
    pub service_urls: HashMap<String, String>,
    /// Deadline for a single inter-service call
    pub inter_service_timeout: Duration,
    /// Location of the local OAuth token cache file
    pub token_cache_path: PathBuf,
    /// Google OAuth client ID (public)
    pub google_client_id: String,
    /// Google OAuth token endpoint
    pub google_token_url: String,
    /// Base URI used to build the default OAuth redirect
    pub base_uri: String,
    /// Title prefix for per-owner contact spreadsheets
    pub sheet_title_prefix: String,
    /// Keep contact sheets in process memory instead of Google Sheets
    pub offline_sheets: bool,

    // --- Secrets ---
    /// Shared secret sent in `x-service-key`
    pub service_key: String,
    /// Google OAuth client secret
    pub google_client_secret: String,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self::test_default()
    }
}

impl Config {
    /// Configuration used by tests: every sibling points at localhost.
    pub fn test_default() -> Self {
        let service_urls = [MAIN_PLATFORM, ORCHESTRATOR, TEXTBEE]
            .into_iter()
            .map(|name| (name.to_string(), "http://127.0.0.1:9".to_string()))
            .collect();

        Self {
            port: 8080,
            service_name: "google-workspace".to_string(),
            service_urls,
            inter_service_timeout: Duration::from_secs(5),
            token_cache_path: env::temp_dir().join("workspace-bridge-test/oauth_tokens.json"),
            google_client_id: "test_client_id".to_string(),
            google_token_url: "http://127.0.0.1:9/token".to_string(),
            base_uri: "http://localhost:8080".to_string(),
            sheet_title_prefix: "Paestro Contacts - Coach".to_string(),
            offline_sheets: true,
            service_key: "test_service_key".to_string(),
            google_client_secret: "test_secret".to_string(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let service_urls = [
            (
                MAIN_PLATFORM,
                "MAIN_PLATFORM_URL",
                "https://paestro-mcp-modular-production.up.railway.app",
            ),
            (
                ORCHESTRATOR,
                "ORCHESTRATOR_URL",
                "https://paestro-orchestrator-mcp-production.up.railway.app",
            ),
            (
                TEXTBEE,
                "TEXTBEE_URL",
                "https://paestro-textbee-server-production.up.railway.app",
            ),
        ]
        .into_iter()
        .map(|(name, var, default)| {
            let url = env::var(var).unwrap_or_else(|_| default.to_string());
            (name.to_string(), url.trim_end_matches('/').to_string())
        })
        .collect();

        let timeout_secs = match env::var("INTER_SERVICE_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::Invalid("INTER_SERVICE_TIMEOUT_SECS"))?,
            Err(_) => 30,
        };

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "google-workspace".to_string()),
            service_urls,
            inter_service_timeout: Duration::from_secs(timeout_secs),
            token_cache_path: env::var("TOKEN_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_TOKEN_CACHE_PATH)),
            google_client_id: env::var("GOOGLE_OAUTH_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("GOOGLE_OAUTH_CLIENT_ID"))?,
            google_token_url: env::var("GOOGLE_TOKEN_URL")
                .unwrap_or_else(|_| DEFAULT_GOOGLE_TOKEN_URL.to_string()),
            base_uri: env::var("WORKSPACE_BASE_URI")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            sheet_title_prefix: env::var("CONTACT_SHEET_PREFIX")
                .unwrap_or_else(|_| "Paestro Contacts - Coach".to_string()),
            offline_sheets: env::var("SHEETS_OFFLINE")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),

            service_key: env::var("GOOGLE_WORKSPACE_SERVICE_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_WORKSPACE_SERVICE_KEY"))?,
            google_client_secret: env::var("GOOGLE_OAUTH_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_OAUTH_CLIENT_SECRET"))?,
        })
    }

    /// Default OAuth redirect URI when the caller does not send one.
    pub fn default_redirect_uri(&self) -> String {
        format!("{}/oauth-callback", self.base_uri.trim_end_matches('/'))
    }

    /// Point a sibling service at a different base URL.
    pub fn with_service_url(mut self, service: &str, url: impl Into<String>) -> Self {
        self.service_urls.insert(service.to_string(), url.into());
        self
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("GOOGLE_WORKSPACE_SERVICE_KEY", " gw-secret ");
        env::set_var("GOOGLE_OAUTH_CLIENT_ID", "test_id");
        env::set_var("GOOGLE_OAUTH_CLIENT_SECRET", "test_secret");
        env::set_var("MAIN_PLATFORM_URL", "http://main.internal/");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.service_key, "gw-secret");
        assert_eq!(config.google_client_id, "test_id");
        assert_eq!(
            config.service_urls.get(MAIN_PLATFORM).map(String::as_str),
            Some("http://main.internal")
        );
        assert!(config.service_urls.contains_key(TEXTBEE));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_default_redirect_uri() {
        let config = Config {
            base_uri: "https://workspace.example.com/".to_string(),
            ..Config::test_default()
        };
        assert_eq!(
            config.default_redirect_uri(),
            "https://workspace.example.com/oauth-callback"
        );
    }
}
