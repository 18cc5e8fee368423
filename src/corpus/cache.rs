//! Local corpus cache
//!
//! A single JSON file holding the last successfully ingested corpus,
//! overwritten wholesale on each ingestion. A missing or corrupt file is
//! never an error on the read path; the caller re-ingests instead.

use std::path::PathBuf;

use crate::corpus::Document;
use crate::errors::{AppError, Result};

#[derive(Clone, Debug)]
pub struct CorpusCache {
    path: PathBuf,
}

impl CorpusCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the cached corpus. Returns an empty list when the cache is
    /// absent or unreadable.
    pub async fn load(&self) -> Vec<Document> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::debug!(path = %self.path.display(), error = %err, "no cached corpus");
                return Vec::new();
            }
        };

        match serde_json::from_slice::<Vec<Document>>(&bytes) {
            Ok(documents) => {
                tracing::info!(
                    path = %self.path.display(),
                    count = documents.len(),
                    "loaded corpus from cache"
                );
                documents
            }
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "corpus cache is corrupt, treating as empty"
                );
                Vec::new()
            }
        }
    }

    /// Persist the corpus, replacing any previous cache file.
    pub async fn store(&self, documents: &[Document]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AppError::CacheError(e.to_string()))?;
            }
        }

        let json = serde_json::to_vec_pretty(documents)
            .map_err(|e| AppError::CacheError(e.to_string()))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| AppError::CacheError(e.to_string()))?;

        tracing::debug!(
            path = %self.path.display(),
            count = documents.len(),
            "corpus cache written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::seed_documents;

    #[tokio::test]
    async fn missing_cache_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CorpusCache::new(dir.path().join("news.json"));
        assert!(cache.load().await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_cache_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("news.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();
        let cache = CorpusCache::new(path);
        assert!(cache.load().await.is_empty());
    }

    #[tokio::test]
    async fn store_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CorpusCache::new(dir.path().join("sub/news.json"));
        let documents = seed_documents();
        cache.store(&documents).await.unwrap();
        assert_eq!(cache.load().await, documents);
    }

    #[tokio::test]
    async fn store_overwrites_previous_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CorpusCache::new(dir.path().join("news.json"));
        let first = seed_documents();
        cache.store(&first).await.unwrap();
        let second: Vec<Document> = first.into_iter().take(2).collect();
        cache.store(&second).await.unwrap();
        assert_eq!(cache.load().await.len(), 2);
    }
}
