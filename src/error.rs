// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent `{success: false, ...}` responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflicting write: {0}")]
    Conflict(String),

    #[error("Service call to {service} timed out after {seconds}s")]
    Timeout { service: String, seconds: u64 },

    #[error("Service call failed ({status}): {}", remote_message(.payload))]
    Remote {
        status: u16,
        payload: serde_json::Value,
    },

    #[error("Google API error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Transport {
        status: Option<u16>,
        message: String,
    },

    #[error("Unknown target service: {0}")]
    UnknownService(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Pull the `error` field out of a sibling service's failure payload.
fn remote_message(payload: &serde_json::Value) -> String {
    payload
        .get("error")
        .and_then(|e| e.as_str())
        .unwrap_or("Unknown error")
        .to_string()
}

impl AppError {
    /// Upstream HTTP status carried by the error, if any.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            AppError::Remote { status, .. } => Some(*status),
            AppError::Transport { status, .. } => *status,
            _ => None,
        }
    }

    /// True when the caller must (re)connect their Google account.
    pub fn requires_auth(&self) -> bool {
        match self {
            AppError::Unauthorized(_) => true,
            AppError::Transport { status, .. } => *status == Some(401),
            _ => false,
        }
    }
}

/// JSON error envelope.
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    #[serde(rename = "requiresAuth", skip_serializing_if = "Option::is_none")]
    requires_auth: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            AppError::Remote { .. } => StatusCode::BAD_GATEWAY,
            AppError::Transport { status, .. } if *status == Some(401) => StatusCode::UNAUTHORIZED,
            AppError::Transport { .. } => StatusCode::BAD_GATEWAY,
            AppError::UnknownService(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "Internal server error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let error = match &self {
            AppError::Transport {
                status: Some(401), ..
            } => "Google authorization expired. Please reconnect to Google Workspace.".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        let details = match self {
            AppError::Remote { payload, .. } => Some(payload),
            _ => None,
        };

        let body = ErrorResponse {
            success: false,
            error,
            requires_auth: (status == StatusCode::UNAUTHORIZED).then_some(true),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers and services
pub type Result<T> = std::result::Result<T, AppError>;
