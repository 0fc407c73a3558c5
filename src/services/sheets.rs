// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Sheets / Drive access for the contact store.
//!
//! `SheetsBackend` is the narrow set of spreadsheet calls the store needs.
//! `GoogleSheetsClient` implements it against Sheets v4 and Drive v3 with
//! the caller's OAuth access token.

use crate::error::AppError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Grid size of a newly created contact tab.
pub const NEW_SHEET_ROWS: u32 = 1000;

/// Rows of cell values, as returned by the values API.
pub type Rows = Vec<Vec<String>>;

/// Spreadsheet operations used by the contact store.
///
/// Ranges are A1 notation including the tab name, e.g. `Contacts!A2:K2`.
#[async_trait]
pub trait SheetsBackend: Send + Sync {
    /// Find a non-trashed spreadsheet by exact title; oldest match first.
    async fn find_spreadsheet(&self, access_token: &str, title: &str)
        -> Result<Option<String>, AppError>;

    /// Create a spreadsheet with a single tab (sheet id 0). Returns its id.
    async fn create_spreadsheet(
        &self,
        access_token: &str,
        title: &str,
        tab: &str,
        column_count: u32,
    ) -> Result<String, AppError>;

    /// Style row 1 of sheet id 0 as a header.
    async fn format_header_row(&self, access_token: &str, spreadsheet_id: &str)
        -> Result<(), AppError>;

    /// Read a range. Trailing empty cells and rows may be omitted.
    async fn get_values(
        &self,
        access_token: &str,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Rows, AppError>;

    /// Overwrite a range with raw values.
    async fn update_values(
        &self,
        access_token: &str,
        spreadsheet_id: &str,
        range: &str,
        rows: Rows,
    ) -> Result<(), AppError>;

    /// Insert rows after the last row with data in `range`.
    async fn append_values(
        &self,
        access_token: &str,
        spreadsheet_id: &str,
        range: &str,
        rows: Rows,
    ) -> Result<(), AppError>;

    /// Clear cell contents in a range; the cells themselves stay.
    async fn clear_values(
        &self,
        access_token: &str,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<(), AppError>;
}

/// Google Sheets v4 + Drive v3 REST client.
#[derive(Clone)]
pub struct GoogleSheetsClient {
    http: reqwest::Client,
    sheets_url: String,
    drive_files_url: String,
}

impl GoogleSheetsClient {
    pub fn new() -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            sheets_url: SHEETS_API_URL.to_string(),
            drive_files_url: DRIVE_FILES_URL.to_string(),
        })
    }

    fn values_url(&self, spreadsheet_id: &str, range: &str, suffix: &str) -> String {
        format!(
            "{}/{}/values/{}{}",
            self.sheets_url,
            urlencoding::encode(spreadsheet_id),
            urlencoding::encode(range),
            suffix
        )
    }

    /// Map a transport failure.
    fn transport(e: reqwest::Error) -> AppError {
        AppError::Transport {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }

    /// Check response status and return error if not successful.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, AppError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 429 {
            tracing::warn!("Google API rate limit hit (429)");
        }

        let message = serde_json::from_str::<GoogleErrorBody>(&body)
            .map(|b| b.error.message)
            .unwrap_or(body);

        Err(AppError::Transport {
            status: Some(status.as_u16()),
            message,
        })
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        Self::check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Transport {
                status: None,
                message: format!("JSON parse error: {}", e),
            })
    }

    async fn post_json(&self, access_token: &str, url: &str, body: &Value) -> Result<(), AppError> {
        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .json(body)
            .send()
            .await
            .map_err(Self::transport)?;

        Self::check_response(response).await?;
        Ok(())
    }
}

#[async_trait]
impl SheetsBackend for GoogleSheetsClient {
    async fn find_spreadsheet(
        &self,
        access_token: &str,
        title: &str,
    ) -> Result<Option<String>, AppError> {
        let query = format!(
            "name='{}' and mimeType='{}' and trashed=false",
            escape_query_literal(title),
            SPREADSHEET_MIME_TYPE
        );

        let response = self
            .http
            .get(&self.drive_files_url)
            .bearer_auth(access_token)
            .query(&[
                ("q", query.as_str()),
                ("spaces", "drive"),
                ("fields", "files(id, name)"),
                ("orderBy", "createdTime"),
            ])
            .send()
            .await
            .map_err(Self::transport)?;

        let list: DriveFileList = Self::check_response_json(response).await?;
        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    async fn create_spreadsheet(
        &self,
        access_token: &str,
        title: &str,
        tab: &str,
        column_count: u32,
    ) -> Result<String, AppError> {
        let body = json!({
            "properties": { "title": title },
            "sheets": [{
                "properties": {
                    "sheetId": 0,
                    "title": tab,
                    "gridProperties": {
                        "rowCount": NEW_SHEET_ROWS,
                        "columnCount": column_count
                    }
                }
            }]
        });

        let response = self
            .http
            .post(&self.sheets_url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(Self::transport)?;

        let created: CreatedSpreadsheet = Self::check_response_json(response).await?;
        Ok(created.spreadsheet_id)
    }

    async fn format_header_row(
        &self,
        access_token: &str,
        spreadsheet_id: &str,
    ) -> Result<(), AppError> {
        let body = json!({
            "requests": [{
                "repeatCell": {
                    "range": { "sheetId": 0, "startRowIndex": 0, "endRowIndex": 1 },
                    "cell": {
                        "userEnteredFormat": {
                            "backgroundColor": { "red": 0.2, "green": 0.5, "blue": 0.9 },
                            "textFormat": {
                                "bold": true,
                                "foregroundColor": { "red": 1.0, "green": 1.0, "blue": 1.0 }
                            }
                        }
                    },
                    "fields": "userEnteredFormat(backgroundColor,textFormat)"
                }
            }]
        });

        let url = format!(
            "{}/{}:batchUpdate",
            self.sheets_url,
            urlencoding::encode(spreadsheet_id)
        );
        self.post_json(access_token, &url, &body).await
    }

    async fn get_values(
        &self,
        access_token: &str,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Rows, AppError> {
        let response = self
            .http
            .get(self.values_url(spreadsheet_id, range, ""))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(Self::transport)?;

        let range: ValueRange = Self::check_response_json(response).await?;
        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    async fn update_values(
        &self,
        access_token: &str,
        spreadsheet_id: &str,
        range: &str,
        rows: Rows,
    ) -> Result<(), AppError> {
        let response = self
            .http
            .put(self.values_url(spreadsheet_id, range, ""))
            .bearer_auth(access_token)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "values": rows }))
            .send()
            .await
            .map_err(Self::transport)?;

        Self::check_response(response).await?;
        Ok(())
    }

    async fn append_values(
        &self,
        access_token: &str,
        spreadsheet_id: &str,
        range: &str,
        rows: Rows,
    ) -> Result<(), AppError> {
        let response = self
            .http
            .post(self.values_url(spreadsheet_id, range, ":append"))
            .bearer_auth(access_token)
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "values": rows }))
            .send()
            .await
            .map_err(Self::transport)?;

        Self::check_response(response).await?;
        Ok(())
    }

    async fn clear_values(
        &self,
        access_token: &str,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<(), AppError> {
        let url = self.values_url(spreadsheet_id, range, ":clear");
        self.post_json(access_token, &url, &json!({})).await
    }
}

/// Escape a literal for a Drive `q` expression.
fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Cells arrive as JSON strings for RAW text, but numbers and booleans
/// typed into the sheet by hand come back as their JSON types.
fn cell_to_string(cell: Value) -> String {
    match cell {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedSpreadsheet {
    spreadsheet_id: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: GoogleErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorDetail {
    message: String,
}
