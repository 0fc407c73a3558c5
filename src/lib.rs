// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Workspace-Bridge: Google Workspace OAuth relay and sheet-backed contacts
//!
//! This crate provides the backend that stores OAuth tokens through sibling
//! services (with a local cache) and keeps each owner's contacts in a
//! Google spreadsheet.

pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use services::{GoogleOAuthClient, InterServiceClient, SessionStore, SheetsBackend};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub relay: InterServiceClient,
    pub sheets: Arc<dyn SheetsBackend>,
    pub sessions: SessionStore,
    pub google_oauth: GoogleOAuthClient,
}
