// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth relay routes called by the orchestrator.

use crate::error::{AppError, Result};
use crate::services::ContactStore;
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// OAuth routes (public).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/oauth/exchange", post(oauth_exchange))
        .route("/sheets/create-contacts", post(create_contacts_sheet))
}

// ─── Code Exchange ───────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRequest {
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub coach_id: Option<String>,
    pub coach_email: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExchangeResponse {
    pub success: bool,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expiry_date: Option<i64>,
    pub token_type: String,
    /// `cached_and_remote` when the relay stored the tokens, else `caller`
    pub storage: &'static str,
    pub storage_result: Option<Value>,
}

/// Exchange an authorization code, store the tokens through the relay when
/// the owner is known, and optionally bind them to a session.
async fn oauth_exchange(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExchangeRequest>,
) -> Result<Json<ExchangeResponse>> {
    let code = request
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    let redirect_uri = request
        .redirect_uri
        .clone()
        .unwrap_or_else(|| state.config.default_redirect_uri());

    let tokens = state
        .google_oauth
        .exchange_code(code, &redirect_uri)
        .await?;

    let owner_id = request.coach_id.as_deref().filter(|id| !id.is_empty());
    let owner_email = request.coach_email.as_deref().filter(|e| !e.is_empty());

    // The caller still gets its tokens if the relay is down
    let storage_result = match (owner_id, owner_email) {
        (Some(id), Some(email)) => match state.relay.store_tokens(&tokens, id, email).await {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::error!(error = %e, "Failed to store OAuth tokens");
                None
            }
        },
        _ => None,
    };

    if let Some(session_id) = request.session_id.as_deref().filter(|s| !s.is_empty()) {
        state.sessions.bind(session_id, owner_id, &tokens);
        tracing::info!("Bound Google credentials to session");
    }

    Ok(Json(ExchangeResponse {
        success: true,
        storage: if storage_result.is_some() {
            "cached_and_remote"
        } else {
            "caller"
        },
        storage_result,
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expiry_date: tokens.expires_in,
        token_type: tokens.token_type.unwrap_or_else(|| "Bearer".to_string()),
    }))
}

// ─── Contact Sheet Bootstrap ─────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSheetRequest {
    pub coach_id: Option<String>,
    pub organization_name: Option<String>,
    pub coach_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSheetResponse {
    pub success: bool,
    pub sheet_id: String,
    pub sheet_url: String,
    pub sheet_name: String,
}

/// Find or create an owner's contact sheet using relay-held tokens.
async fn create_contacts_sheet(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateSheetRequest>,
) -> Result<Json<CreateSheetResponse>> {
    let coach_id = request
        .coach_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing coach ID".to_string()))?;

    let tokens = state.relay.get_tokens(coach_id).await?.ok_or_else(|| {
        AppError::Unauthorized(
            "No OAuth tokens found. Please connect to Google Workspace first.".to_string(),
        )
    })?;

    let sheet_name = format!(
        "{} {} Contacts",
        request.organization_name.as_deref().unwrap_or("Organization"),
        request.coach_name.as_deref().unwrap_or("Coach")
    );

    let store = ContactStore::new(
        state.sheets.clone(),
        tokens.access_token,
        state.config.sheet_title_prefix.clone(),
    );
    let sheet = store.resolve_sheet(coach_id, Some(&sheet_name)).await?;
    tracing::info!(spreadsheet_id = %sheet.spreadsheet_id, "Contact sheet ready");

    Ok(Json(CreateSheetResponse {
        success: true,
        sheet_url: format!("{}/edit", sheet.url()),
        sheet_id: sheet.spreadsheet_id,
        sheet_name,
    }))
}
