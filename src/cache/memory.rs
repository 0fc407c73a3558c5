//! In-memory token cache for tests and single-process setups.

use super::{CacheError, TokenCache};
use crate::models::CachedTokenRecord;
use async_trait::async_trait;
use dashmap::DashMap;

/// Token cache held in a `DashMap`; contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryTokenCache {
    records: DashMap<String, CachedTokenRecord>,
}

impl InMemoryTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, owner_id: &str) -> bool {
        self.records.contains_key(owner_id)
    }
}

#[async_trait]
impl TokenCache for InMemoryTokenCache {
    async fn get(&self, owner_id: &str) -> Result<Option<CachedTokenRecord>, CacheError> {
        Ok(self.records.get(owner_id).map(|r| r.value().clone()))
    }

    async fn put(&self, owner_id: &str, record: CachedTokenRecord) -> Result<(), CacheError> {
        self.records.insert(owner_id.to_string(), record);
        Ok(())
    }
}
