use crate::{EngineError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::info;

/// Pluggable persistence backend for cache entries.
///
/// Payloads are opaque JSON strings keyed by the full namespaced cache key.
/// Implementations must tolerate concurrent calls; same-key write races are
/// last-writer-wins.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<String>>;
    async fn write(&self, key: &str, payload: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
    /// All stored keys (used for startup hydration and namespace clears)
    async fn keys(&self) -> Result<Vec<String>>;
}

/// In-memory storage backend
#[derive(Default)]
pub struct MemoryStorage {
    payloads: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.payloads.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, payload: &str) -> Result<()> {
        self.payloads
            .write()
            .await
            .insert(key.to_string(), payload.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.payloads.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.payloads.read().await.keys().cloned().collect())
    }
}

/// File-backed storage: one JSON file per cache key in a cache directory
pub struct FileStorage {
    cache_dir: PathBuf,
}

impl FileStorage {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Create the cache directory if it doesn't exist
    pub async fn initialize(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        info!("📁 Cache directory initialized: {}", self.cache_dir.display());
        Ok(())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", sanitize_key(key)))
    }
}

/// Keys become file names; anything outside `[A-Za-z0-9_-]` is replaced
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl CacheStorage for FileStorage {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(EngineError::CacheStorage(format!(
                "read failed for {}: {}",
                key, e
            ))),
        }
    }

    async fn write(&self, key: &str, payload: &str) -> Result<()> {
        tokio::fs::write(self.path_for(key), payload)
            .await
            .map_err(|e| EngineError::CacheStorage(format!("write failed for {}: {}", key, e)))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EngineError::CacheStorage(format!(
                "remove failed for {}: {}",
                key, e
            ))),
        }
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.cache_dir)
            .await
            .map_err(|e| EngineError::CacheStorage(format!("read_dir failed: {}", e)))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| EngineError::CacheStorage(format!("read_dir failed: {}", e)))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(stem.to_string());
                }
            }
        }

        Ok(keys)
    }
}
