// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::{json, Value};
use workspace_bridge::error::AppError;

async fn render(err: AppError) -> (StatusCode, Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_unauthorized_sets_requires_auth() {
    let (status, body) = render(AppError::Unauthorized("No session ID provided".into())).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body,
        json!({ "success": false, "error": "No session ID provided", "requiresAuth": true })
    );
}

#[tokio::test]
async fn test_google_401_asks_for_reconnect() {
    let err = AppError::Transport {
        status: Some(401),
        message: "Request had invalid authentication credentials.".into(),
    };
    assert!(err.requires_auth());

    let (status, body) = render(err).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["requiresAuth"], true);
    assert!(body["error"].as_str().unwrap().contains("reconnect"));
}

#[tokio::test]
async fn test_other_google_failures_are_bad_gateway() {
    let err = AppError::Transport {
        status: Some(429),
        message: "Quota exceeded".into(),
    };
    assert!(!err.requires_auth());
    assert_eq!(err.upstream_status(), Some(429));

    let (status, body) = render(err).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.get("requiresAuth").is_none());
}

#[tokio::test]
async fn test_remote_failure_carries_payload() {
    let err = AppError::Remote {
        status: 503,
        payload: json!({ "error": "maintenance", "retryAfter": 30 }),
    };
    assert_eq!(err.to_string(), "Service call failed (503): maintenance");

    let (status, body) = render(err).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["details"]["retryAfter"], 30);
}

#[tokio::test]
async fn test_status_mapping() {
    let cases = [
        (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
        (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
        (AppError::Conflict("x".into()), StatusCode::CONFLICT),
        (
            AppError::Timeout {
                service: "main-platform".into(),
                seconds: 30,
            },
            StatusCode::GATEWAY_TIMEOUT,
        ),
        (
            AppError::UnknownService("billing".into()),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];

    for (err, expected) in cases {
        let (status, body) = render(err).await;
        assert_eq!(status, expected);
        assert_eq!(body["success"], false);
    }
}

#[tokio::test]
async fn test_internal_error_hides_details() {
    let err = AppError::Internal(anyhow::anyhow!("disk full at /var/lib/secret"));

    let (status, body) = render(err).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
}
