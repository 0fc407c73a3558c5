// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! File-backed token cache: one JSON object mapping owner id to record.
//!
//! Every write reads the whole file, mutates it in memory and writes the
//! whole file back. There is no file lock, so concurrent writers race and
//! the last full image wins.

use super::{CacheError, TokenCache};
use crate::models::CachedTokenRecord;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

type CacheImage = BTreeMap<String, CachedTokenRecord>;

/// Token cache persisted as a single JSON file.
#[derive(Debug, Clone)]
pub struct FileTokenCache {
    path: PathBuf,
}

impl FileTokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the full cache image. A missing file is an empty cache.
    async fn load(&self) -> Result<CacheImage, CacheError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(CacheImage::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(CacheImage::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, image: &CacheImage) -> Result<(), CacheError> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let bytes = serde_json::to_vec_pretty(image)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl TokenCache for FileTokenCache {
    async fn get(&self, owner_id: &str) -> Result<Option<CachedTokenRecord>, CacheError> {
        Ok(self.load().await?.remove(owner_id))
    }

    async fn put(&self, owner_id: &str, record: CachedTokenRecord) -> Result<(), CacheError> {
        let mut image = self.load().await?;
        image.insert(owner_id.to_string(), record);
        self.store(&image).await
    }
}
