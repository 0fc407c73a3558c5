// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session middleware for contact routes.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Header carrying the caller's session id.
pub const SESSION_HEADER: &str = "session-id";

/// Middleware that requires a session bound to Google credentials.
///
/// On success the `SessionCredentials` are inserted as a request extension.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session_id = request
        .headers()
        .get(SESSION_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Unauthorized("No session ID provided".to_string()))?;

    let credentials = state.sessions.resolve(session_id).ok_or_else(|| {
        AppError::Unauthorized(
            "No Google account connected. Please connect your Google account first."
                .to_string(),
        )
    })?;

    request.extensions_mut().insert(credentials);
    Ok(next.run(request).await)
}
