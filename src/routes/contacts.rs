// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Contact sheet routes (require a `session-id` bound to Google credentials).
//!
//! Two addressing styles reach the same operations:
//! - REST: `/coach/{coach_id}/sheets-contacts[/{contact_id}]`
//! - Legacy: `POST /sheets-contacts/{op}` with `coach_id` in the body

use crate::error::{AppError, Result};
use crate::models::{ContactInput, ContactRecord, SyncStats};
use crate::services::{ContactStore, SessionCredentials, SheetHandle};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Contact routes. The session middleware is applied in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/coach/{coach_id}/sheets-contacts",
            get(list_for_coach).post(add_for_coach),
        )
        .route(
            "/coach/{coach_id}/sheets-contacts/{contact_id}",
            put(update_for_coach).delete(delete_for_coach),
        )
        .route(
            "/coach/{coach_id}/sheets-contacts/sync",
            post(sync_for_coach),
        )
        .route(
            "/coach/{coach_id}/init-sheets-contacts",
            post(init_for_coach),
        )
        .route("/sheets-contacts/list", post(legacy_list))
        .route("/sheets-contacts/add", post(legacy_add))
        .route("/sheets-contacts/update", post(legacy_update))
        .route("/sheets-contacts/delete", post(legacy_delete))
        .route("/sheets-contacts/init", post(legacy_init))
        .route("/sheets-contacts/sync", post(legacy_sync))
}

// ─── Response Envelopes ──────────────────────────────────────

#[derive(Serialize)]
pub struct ContactListResponse {
    pub success: bool,
    pub contacts: Vec<ContactRecord>,
    pub total: usize,
    pub spreadsheet_id: String,
}

#[derive(Serialize)]
pub struct ContactResponse {
    pub success: bool,
    pub contact: ContactRecord,
    pub message: String,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize)]
pub struct InitResponse {
    pub success: bool,
    pub spreadsheet_id: String,
    pub message: String,
    pub sheet_url: String,
}

#[derive(Serialize)]
pub struct SyncResponse {
    pub success: bool,
    pub contacts: Vec<ContactRecord>,
    pub sync_stats: SyncStats,
    pub message: String,
}

// ─── Request Bodies ──────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct InitRequest {
    #[serde(default)]
    sheet_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SyncRequest {
    #[serde(default)]
    dashboard_contacts: Option<Vec<ContactInput>>,
}

#[derive(Debug, Default, Deserialize)]
struct LegacyRequest {
    #[serde(default)]
    coach_id: Option<String>,
    #[serde(default)]
    contact_id: Option<String>,
    #[serde(default)]
    contact_data: Option<ContactInput>,
    #[serde(default)]
    updates: Option<ContactInput>,
    #[serde(default)]
    sheet_name: Option<String>,
    #[serde(default)]
    dashboard_contacts: Option<Vec<ContactInput>>,
}

impl LegacyRequest {
    fn coach_id(&self) -> Result<&str> {
        required(self.coach_id.as_deref(), "coach_id")
    }

    fn contact_id(&self) -> Result<&str> {
        required(self.contact_id.as_deref(), "contact_id")
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("{} is required", field)))
}

/// Parse a JSON body; an empty body reads as the default value.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("Invalid JSON: {}", e)))
}

/// Contact fields sent either wrapped in `key` or as the bare body.
fn parse_contact_body(body: &Bytes, key: &str) -> Result<ContactInput> {
    let value: Value = parse_body::<Option<Value>>(body)?.unwrap_or(Value::Null);
    let fields = match value {
        Value::Object(mut map) if map.contains_key(key) => map.remove(key).unwrap_or(Value::Null),
        other => other,
    };

    if fields.is_null() {
        return Ok(ContactInput::default());
    }
    serde_json::from_value(fields)
        .map_err(|e| AppError::BadRequest(format!("Invalid contact data: {}", e)))
}

// ─── Operations ──────────────────────────────────────────────

fn contact_store(state: &AppState, credentials: &SessionCredentials) -> ContactStore {
    ContactStore::new(
        state.sheets.clone(),
        credentials.access_token.clone(),
        state.config.sheet_title_prefix.clone(),
    )
}

async fn open_sheet(
    state: &AppState,
    credentials: &SessionCredentials,
    coach_id: &str,
) -> Result<(ContactStore, SheetHandle)> {
    let coach_id = required(Some(coach_id), "coach_id")?;
    let store = contact_store(state, credentials);
    let sheet = store.resolve_sheet(coach_id, None).await?;
    Ok((store, sheet))
}

async fn list(
    state: &AppState,
    credentials: &SessionCredentials,
    coach_id: &str,
) -> Result<Json<ContactListResponse>> {
    let (store, sheet) = open_sheet(state, credentials, coach_id).await?;
    let contacts = store.list_contacts(&sheet).await?;

    Ok(Json(ContactListResponse {
        success: true,
        total: contacts.len(),
        contacts,
        spreadsheet_id: sheet.spreadsheet_id,
    }))
}

async fn add(
    state: &AppState,
    credentials: &SessionCredentials,
    coach_id: &str,
    input: ContactInput,
) -> Result<Json<ContactResponse>> {
    let (store, sheet) = open_sheet(state, credentials, coach_id).await?;
    let contact = store.add_contact(&sheet, input).await?;

    let name = if contact.name.is_empty() {
        "Unknown"
    } else {
        contact.name.as_str()
    };
    let message = format!("Contact '{}' added successfully", name);

    Ok(Json(ContactResponse {
        success: true,
        contact,
        message,
    }))
}

async fn update(
    state: &AppState,
    credentials: &SessionCredentials,
    coach_id: &str,
    contact_id: &str,
    patch: ContactInput,
) -> Result<Json<ContactResponse>> {
    let (store, sheet) = open_sheet(state, credentials, coach_id).await?;
    let contact = store.update_contact(&sheet, contact_id, patch).await?;

    Ok(Json(ContactResponse {
        success: true,
        contact,
        message: "Contact updated successfully".to_string(),
    }))
}

async fn delete(
    state: &AppState,
    credentials: &SessionCredentials,
    coach_id: &str,
    contact_id: &str,
) -> Result<Json<DeleteResponse>> {
    let (store, sheet) = open_sheet(state, credentials, coach_id).await?;
    let success = store.delete_contact(&sheet, contact_id).await?;

    Ok(Json(DeleteResponse {
        success,
        message: "Contact deleted successfully".to_string(),
    }))
}

async fn init(
    state: &AppState,
    credentials: &SessionCredentials,
    coach_id: &str,
    sheet_name: Option<&str>,
) -> Result<Json<InitResponse>> {
    let coach_id = required(Some(coach_id), "coach_id")?;
    let store = contact_store(state, credentials);
    let sheet = store.resolve_sheet(coach_id, sheet_name).await?;
    let seeded = store.seed_examples(&sheet).await?;
    tracing::info!(seeded = seeded.len(), "Initialized contact sheet");

    Ok(Json(InitResponse {
        success: true,
        sheet_url: sheet.url(),
        spreadsheet_id: sheet.spreadsheet_id,
        message: "Google Sheets contact database initialized successfully".to_string(),
    }))
}

async fn sync(
    state: &AppState,
    credentials: &SessionCredentials,
    coach_id: &str,
    external: Vec<ContactInput>,
) -> Result<Json<SyncResponse>> {
    let (store, sheet) = open_sheet(state, credentials, coach_id).await?;
    let sync_stats = store.sync_from_external(&sheet, external).await?;
    let contacts = store.list_contacts(&sheet).await?;

    Ok(Json(SyncResponse {
        success: true,
        contacts,
        message: format!(
            "Synced {} new, {} updated contacts",
            sync_stats.added, sync_stats.updated
        ),
        sync_stats,
    }))
}

// ─── REST Handlers ───────────────────────────────────────────

async fn list_for_coach(
    State(state): State<Arc<AppState>>,
    Extension(credentials): Extension<SessionCredentials>,
    Path(coach_id): Path<String>,
) -> Result<Json<ContactListResponse>> {
    list(&state, &credentials, &coach_id).await
}

async fn add_for_coach(
    State(state): State<Arc<AppState>>,
    Extension(credentials): Extension<SessionCredentials>,
    Path(coach_id): Path<String>,
    body: Bytes,
) -> Result<Json<ContactResponse>> {
    let input = parse_contact_body(&body, "contact_data")?;
    add(&state, &credentials, &coach_id, input).await
}

async fn update_for_coach(
    State(state): State<Arc<AppState>>,
    Extension(credentials): Extension<SessionCredentials>,
    Path((coach_id, contact_id)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<ContactResponse>> {
    let patch = parse_contact_body(&body, "updates")?;
    update(&state, &credentials, &coach_id, &contact_id, patch).await
}

async fn delete_for_coach(
    State(state): State<Arc<AppState>>,
    Extension(credentials): Extension<SessionCredentials>,
    Path((coach_id, contact_id)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>> {
    delete(&state, &credentials, &coach_id, &contact_id).await
}

async fn init_for_coach(
    State(state): State<Arc<AppState>>,
    Extension(credentials): Extension<SessionCredentials>,
    Path(coach_id): Path<String>,
    body: Bytes,
) -> Result<Json<InitResponse>> {
    let request: InitRequest = parse_body(&body)?;
    init(&state, &credentials, &coach_id, request.sheet_name.as_deref()).await
}

async fn sync_for_coach(
    State(state): State<Arc<AppState>>,
    Extension(credentials): Extension<SessionCredentials>,
    Path(coach_id): Path<String>,
    body: Bytes,
) -> Result<Json<SyncResponse>> {
    let request: SyncRequest = parse_body(&body)?;
    let external = request.dashboard_contacts.unwrap_or_default();
    sync(&state, &credentials, &coach_id, external).await
}

// ─── Legacy Handlers ─────────────────────────────────────────

async fn legacy_list(
    State(state): State<Arc<AppState>>,
    Extension(credentials): Extension<SessionCredentials>,
    body: Bytes,
) -> Result<Json<ContactListResponse>> {
    let request: LegacyRequest = parse_body(&body)?;
    list(&state, &credentials, request.coach_id()?).await
}

async fn legacy_add(
    State(state): State<Arc<AppState>>,
    Extension(credentials): Extension<SessionCredentials>,
    body: Bytes,
) -> Result<Json<ContactResponse>> {
    let request: LegacyRequest = parse_body(&body)?;
    let coach_id = request.coach_id()?.to_string();
    let input = request.contact_data.unwrap_or_default();
    add(&state, &credentials, &coach_id, input).await
}

async fn legacy_update(
    State(state): State<Arc<AppState>>,
    Extension(credentials): Extension<SessionCredentials>,
    body: Bytes,
) -> Result<Json<ContactResponse>> {
    let request: LegacyRequest = parse_body(&body)?;
    let coach_id = request.coach_id()?.to_string();
    let contact_id = request.contact_id()?.to_string();
    let patch = request.updates.unwrap_or_default();
    update(&state, &credentials, &coach_id, &contact_id, patch).await
}

async fn legacy_delete(
    State(state): State<Arc<AppState>>,
    Extension(credentials): Extension<SessionCredentials>,
    body: Bytes,
) -> Result<Json<DeleteResponse>> {
    let request: LegacyRequest = parse_body(&body)?;
    delete(
        &state,
        &credentials,
        request.coach_id()?,
        request.contact_id()?,
    )
    .await
}

async fn legacy_init(
    State(state): State<Arc<AppState>>,
    Extension(credentials): Extension<SessionCredentials>,
    body: Bytes,
) -> Result<Json<InitResponse>> {
    let request: LegacyRequest = parse_body(&body)?;
    init(
        &state,
        &credentials,
        request.coach_id()?,
        request.sheet_name.as_deref(),
    )
    .await
}

async fn legacy_sync(
    State(state): State<Arc<AppState>>,
    Extension(credentials): Extension<SessionCredentials>,
    body: Bytes,
) -> Result<Json<SyncResponse>> {
    let request: LegacyRequest = parse_body(&body)?;
    let coach_id = request.coach_id()?.to_string();
    let external = request.dashboard_contacts.unwrap_or_default();
    sync(&state, &credentials, &coach_id, external).await
}
