// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local OAuth token cache.
//!
//! The cache is keyed by owner id and holds at most one record per owner.
//! It only saves a round-trip to the authoritative store; losing it is
//! never an error for callers.

pub mod file;
pub mod memory;

pub use file::FileTokenCache;
pub use memory::InMemoryTokenCache;

use crate::models::CachedTokenRecord;
use async_trait::async_trait;

/// Cache failures. Callers log these and fall back to the remote store.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("token cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("token cache is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Key-value store for cached token records.
#[async_trait]
pub trait TokenCache: Send + Sync {
    /// Fetch the record for `owner_id`, if any.
    async fn get(&self, owner_id: &str) -> Result<Option<CachedTokenRecord>, CacheError>;

    /// Insert or overwrite the record for `owner_id`.
    async fn put(&self, owner_id: &str, record: CachedTokenRecord) -> Result<(), CacheError>;
}
