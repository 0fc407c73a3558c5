// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Workspace-Bridge API Server
//!
//! Relays Google OAuth tokens between sibling services and serves
//! spreadsheet-backed contact lists.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use workspace_bridge::{
    cache::FileTokenCache,
    config::Config,
    services::{
        GoogleOAuthClient, GoogleSheetsClient, InMemorySheets, InterServiceClient, SessionStore,
        SheetsBackend,
    },
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(
        port = config.port,
        service = %config.service_name,
        "Starting Workspace-Bridge API"
    );

    // Local token cache mirrors the main platform's token store
    let token_cache = Arc::new(FileTokenCache::new(config.token_cache_path.clone()));
    tracing::info!(path = %config.token_cache_path.display(), "Token cache initialized");

    let relay = InterServiceClient::new(&config, token_cache);

    let sheets: Arc<dyn SheetsBackend> = if config.offline_sheets {
        tracing::warn!("SHEETS_OFFLINE set, contact sheets are kept in memory");
        Arc::new(InMemorySheets::new())
    } else {
        Arc::new(GoogleSheetsClient::new().expect("Failed to initialize Sheets client"))
    };

    // Build shared state
    let state = Arc::new(AppState {
        google_oauth: GoogleOAuthClient::new(&config),
        config: config.clone(),
        relay,
        sheets,
        sessions: SessionStore::new(),
    });

    // Build router
    let app = workspace_bridge::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("workspace_bridge=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
