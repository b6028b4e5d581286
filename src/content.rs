//! Drama content payloads and fetch collaborators
//!
//! The engine never talks to the network itself; drama metadata, keyword
//! lists, and subtitle documents arrive through these interfaces. `load_drama`
//! is the cache-first orchestration used by clients.

use crate::cache::ContentCache;
use crate::keywords::KeywordDefinition;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Metadata for one video micro-drama
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DramaContent {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub video_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle_url: Option<String>,
}

/// Remote drama/keyword fetch collaborator
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn fetch_drama(&self, drama_id: &str) -> Result<DramaContent>;
    async fn fetch_keywords(&self, drama_id: &str) -> Result<Vec<KeywordDefinition>>;
}

/// Remote subtitle document fetch collaborator
#[async_trait]
pub trait SubtitleSource: Send + Sync {
    async fn fetch(&self, subtitle_url: &str) -> Result<String>;
}

/// Load a drama and its keyword list, cache first. On a cache miss the
/// provider is consulted and the result cached for next time; provider
/// errors propagate (the caller owns retry policy for content fetches).
pub async fn load_drama(
    provider: &dyn ContentProvider,
    cache: &ContentCache,
    drama_id: &str,
) -> Result<(DramaContent, Vec<KeywordDefinition>)> {
    if let (Some(drama), Some(keywords)) = (
        cache.get_drama(drama_id).await,
        cache.get_keywords(drama_id).await,
    ) {
        debug!("📚 Drama {} served from cache", drama_id);
        return Ok((drama, keywords));
    }

    let drama = provider.fetch_drama(drama_id).await?;
    let keywords = provider.fetch_keywords(drama_id).await?;
    cache.cache_drama_content(&drama, &keywords).await;

    Ok((drama, keywords))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheSettings, MemoryStorage};
    use crate::EngineError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingProvider {
        fetches: AtomicUsize,
    }

    impl CountingProvider {
        fn new() -> Self {
            Self {
                fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ContentProvider for CountingProvider {
        async fn fetch_drama(&self, drama_id: &str) -> Result<DramaContent> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(DramaContent {
                id: drama_id.to_string(),
                title: "Coffee Shop Confessions".to_string(),
                description: None,
                video_url: "https://cdn.example/ep1.mp4".to_string(),
                subtitle_url: Some("https://cdn.example/ep1.srt".to_string()),
            })
        }

        async fn fetch_keywords(&self, _drama_id: &str) -> Result<Vec<KeywordDefinition>> {
            Ok(vec![KeywordDefinition {
                id: "k1".to_string(),
                word: "hello".to_string(),
                translation: "hola".to_string(),
                start_time: 2.5,
                end_time: 5.0,
                audio_url: None,
            }])
        }
    }

    struct OfflineProvider;

    #[async_trait]
    impl ContentProvider for OfflineProvider {
        async fn fetch_drama(&self, _drama_id: &str) -> Result<DramaContent> {
            Err(EngineError::ContentFetch("offline".to_string()))
        }

        async fn fetch_keywords(&self, _drama_id: &str) -> Result<Vec<KeywordDefinition>> {
            Err(EngineError::ContentFetch("offline".to_string()))
        }
    }

    fn cache() -> ContentCache {
        ContentCache::new(CacheSettings::default(), Arc::new(MemoryStorage::new()))
    }

    #[tokio::test]
    async fn test_load_drama_fetches_then_serves_from_cache() {
        let provider = CountingProvider::new();
        let cache = cache();

        let (first, keywords) = load_drama(&provider, &cache, "d1").await.unwrap();
        assert_eq!(first.id, "d1");
        assert_eq!(keywords.len(), 1);
        assert_eq!(provider.fetches.load(Ordering::SeqCst), 1);

        // Second load hits the cache; the provider is not consulted again
        let (second, _) = load_drama(&provider, &cache, "d1").await.unwrap();
        assert_eq!(second, first);
        assert_eq!(provider.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cached_content_survives_provider_outage() {
        let cache = cache();
        load_drama(&CountingProvider::new(), &cache, "d1")
            .await
            .unwrap();

        let (drama, _) = load_drama(&OfflineProvider, &cache, "d1").await.unwrap();
        assert_eq!(drama.id, "d1");
    }

    #[tokio::test]
    async fn test_fetch_error_propagates_on_cold_cache() {
        let result = load_drama(&OfflineProvider, &cache(), "d1").await;
        assert!(matches!(result, Err(EngineError::ContentFetch(_))));
    }
}
