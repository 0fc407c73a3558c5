//! OAuth token models for the relay and its local cache.

use serde::{Deserialize, Serialize};

/// Provider-issued token set.
///
/// Only the fields this service reads are typed; every other key the
/// provider returns (`id_token`, `refresh_token_expires_in`, ...) is kept in
/// `extra` so a bundle survives the cache and the remote store unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBundle {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TokenBundle {
    /// Bundle with only an access token (tests and manual wiring).
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_in: None,
            token_type: Some("Bearer".to_string()),
            scope: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// One owner's entry in the local token cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedTokenRecord {
    /// Owner's email address
    pub email: String,
    /// Token bundle as issued
    pub tokens: TokenBundle,
    /// When the record was written (RFC 3339)
    pub cached_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_token_fields_survive_round_trip() {
        let raw = json!({
            "access_token": "ya29.abc",
            "refresh_token": "1//xyz",
            "expires_in": 3599,
            "token_type": "Bearer",
            "id_token": "eyJ...",
            "refresh_token_expires_in": 604799
        });

        let bundle: TokenBundle = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(bundle.expires_in, Some(3599));
        assert_eq!(bundle.extra.get("id_token"), Some(&json!("eyJ...")));
        assert_eq!(serde_json::to_value(&bundle).unwrap(), raw);
    }
}
