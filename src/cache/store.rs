use super::storage::CacheStorage;
use crate::content::DramaContent;
use crate::keywords::KeywordDefinition;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// A single cache entry with TTL and access metadata.
///
/// Persisted as JSON under the full namespaced key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Full namespaced key (`<namespace>_<resourceType>_<id>`)
    pub key: String,
    /// Serialized value
    pub data: serde_json::Value,
    /// Creation time, epoch milliseconds
    pub timestamp: u64,
    /// Expiry time, epoch milliseconds
    pub expires_at: u64,
    pub access_count: u64,
    /// Last read time, epoch milliseconds
    pub last_accessed: u64,
    pub size_bytes: u64,
}

impl CacheEntry {
    fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }
}

/// Cache tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Key namespace; `clear()` only touches keys under it
    pub namespace: String,
    /// Total size budget for live entries, bytes
    pub max_size_bytes: u64,
    /// TTL applied by the convenience helpers
    pub default_ttl_seconds: u64,
    /// TTL for video preload markers
    pub preload_ttl_seconds: u64,
    /// Bound on a single storage operation; exceeding it is a miss/no-op
    pub op_timeout_ms: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            namespace: "lingodrama".to_string(),
            max_size_bytes: 10 * 1024 * 1024,
            default_ttl_seconds: 3600,
            preload_ttl_seconds: 1800,
            op_timeout_ms: 250,
        }
    }
}

/// Aggregate cache statistics (live entries only)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub size_bytes: u64,
    pub item_count: usize,
    pub preload_queue_size: usize,
}

/// Metadata about one cached entry, for maintenance tooling
#[derive(Debug, Clone)]
pub struct CacheEntryInfo {
    pub key: String,
    pub size_bytes: u64,
    pub age_seconds: u64,
    pub access_count: u64,
    pub is_expired: bool,
}

/// TTL- and size-bounded local content cache.
///
/// The in-memory index is authoritative; the storage backend is a write-through
/// persistence layer. Storage failures are logged and degrade to misses and
/// no-ops. `set`/`get` on different keys are independent; same-key writes are
/// last-writer-wins.
pub struct ContentCache {
    settings: CacheSettings,
    entries: RwLock<HashMap<String, CacheEntry>>,
    preload_queue: Mutex<VecDeque<String>>,
    storage: Arc<dyn CacheStorage>,
}

impl ContentCache {
    pub fn new(settings: CacheSettings, storage: Arc<dyn CacheStorage>) -> Self {
        Self {
            settings,
            entries: RwLock::new(HashMap::new()),
            preload_queue: Mutex::new(VecDeque::new()),
            storage,
        }
    }

    /// Load persisted entries for this namespace into the in-memory index.
    /// Unreadable payloads are skipped with a warning.
    pub async fn hydrate(&self) -> usize {
        let keys = match self.storage.keys().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Cache hydration skipped: {}", e);
                return 0;
            }
        };

        let prefix = format!("{}_", self.settings.namespace);
        let mut loaded = 0;
        for key in keys.iter().filter(|k| k.starts_with(&prefix)) {
            match self.storage_read(key).await {
                Some(payload) => match serde_json::from_str::<CacheEntry>(&payload) {
                    Ok(entry) => {
                        self.entries.write().await.insert(entry.key.clone(), entry);
                        loaded += 1;
                    }
                    Err(e) => warn!("Skipping unreadable cache entry {}: {}", key, e),
                },
                None => continue,
            }
        }

        if loaded > 0 {
            info!("📦 Hydrated {} cache entries from storage", loaded);
        }
        loaded
    }

    /// Store a value under a namespaced key with the given TTL.
    /// Serialization or storage failures make this a logged no-op.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_seconds: u64) {
        let data = match serde_json::to_value(value) {
            Ok(data) => data,
            Err(e) => {
                warn!("Cache set skipped for {}: {}", key, e);
                return;
            }
        };

        let full_key = self.full_key(key);
        let now = now_ms();
        let size_bytes = data.to_string().len() as u64;
        let entry = CacheEntry {
            key: full_key.clone(),
            data,
            timestamp: now,
            expires_at: now + ttl_seconds.saturating_mul(1000),
            access_count: 0,
            last_accessed: now,
            size_bytes,
        };

        self.entries
            .write()
            .await
            .insert(full_key.clone(), entry.clone());

        if let Ok(payload) = serde_json::to_string(&entry) {
            self.storage_write(&full_key, &payload).await;
        }

        self.evict_over_budget().await;
    }

    /// Fetch a value by namespaced key. Absent, expired, unreadable, or
    /// timed-out entries are all misses; hits bump the access metadata.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let full_key = self.full_key(key);
        let now = now_ms();

        let entry = match self.entries.read().await.get(&full_key).cloned() {
            Some(entry) => entry,
            None => {
                let payload = self.storage_read(&full_key).await?;
                let entry: CacheEntry = match serde_json::from_str(&payload) {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!("Unreadable cache payload for {}: {}", full_key, e);
                        return None;
                    }
                };
                self.entries
                    .write()
                    .await
                    .insert(full_key.clone(), entry.clone());
                entry
            }
        };

        if entry.is_expired(now) {
            debug!("⏰ Cache entry expired: {}", full_key);
            self.remove_full_key(&full_key).await;
            return None;
        }

        {
            let mut entries = self.entries.write().await;
            if let Some(live) = entries.get_mut(&full_key) {
                live.access_count += 1;
                live.last_accessed = now;
            }
        }

        match serde_json::from_value(entry.data) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Cache value type mismatch for {}: {}", full_key, e);
                None
            }
        }
    }

    /// Remove one entry by namespaced key
    pub async fn remove(&self, key: &str) -> bool {
        let full_key = self.full_key(key);
        self.remove_full_key(&full_key).await
    }

    /// Store a drama payload and its keyword list under two independently
    /// expirable keys (`drama_<id>`, `keywords_<id>`)
    pub async fn cache_drama_content(&self, drama: &DramaContent, keywords: &[KeywordDefinition]) {
        let ttl = self.settings.default_ttl_seconds;
        self.set(&format!("drama_{}", drama.id), drama, ttl).await;
        self.set(&format!("keywords_{}", drama.id), &keywords, ttl)
            .await;
        debug!(
            "💾 Cached drama {} with {} keywords",
            drama.id,
            keywords.len()
        );
    }

    pub async fn get_drama(&self, drama_id: &str) -> Option<DramaContent> {
        self.get(&format!("drama_{}", drama_id)).await
    }

    pub async fn get_keywords(&self, drama_id: &str) -> Option<Vec<KeywordDefinition>> {
        self.get(&format!("keywords_{}", drama_id)).await
    }

    /// Enqueue a video URL for preloading
    pub async fn queue_video_preload(&self, url: &str) {
        self.preload_queue.lock().await.push_back(url.to_string());
    }

    /// Record that a video URL has been preloaded
    pub async fn mark_video_preloaded(&self, url: &str) {
        self.set(&preload_key(url), &url, self.settings.preload_ttl_seconds)
            .await;
    }

    /// True iff a non-expired preload marker exists for the URL
    pub async fn is_video_preloaded(&self, url: &str) -> bool {
        self.get::<String>(&preload_key(url)).await.is_some()
    }

    /// Drain the preload queue, marking every queued URL. Returns the number
    /// of URLs processed.
    pub async fn process_preload_queue(&self) -> usize {
        let urls: Vec<String> = self.preload_queue.lock().await.drain(..).collect();
        if urls.is_empty() {
            return 0;
        }

        let marks = urls.iter().map(|url| self.mark_video_preloaded(url));
        futures::future::join_all(marks).await;

        debug!("🎬 Processed {} queued video preloads", urls.len());
        urls.len()
    }

    /// Aggregate statistics over live (unexpired) entries
    pub async fn stats(&self) -> CacheStats {
        let now = now_ms();
        let entries = self.entries.read().await;
        let live = entries.values().filter(|e| !e.is_expired(now));

        let (size_bytes, item_count) = live.fold((0, 0), |(bytes, count), e| {
            (bytes + e.size_bytes, count + 1)
        });

        CacheStats {
            size_bytes,
            item_count,
            preload_queue_size: self.preload_queue.lock().await.len(),
        }
    }

    /// Per-entry metadata, newest first, for maintenance tooling
    pub async fn list_entries(&self) -> Vec<CacheEntryInfo> {
        let now = now_ms();
        let entries = self.entries.read().await;
        let mut infos: Vec<CacheEntryInfo> = entries
            .values()
            .map(|e| CacheEntryInfo {
                key: e.key.clone(),
                size_bytes: e.size_bytes,
                age_seconds: now.saturating_sub(e.timestamp) / 1000,
                access_count: e.access_count,
                is_expired: e.is_expired(now),
            })
            .collect();

        infos.sort_by_key(|info| info.age_seconds);
        infos
    }

    /// Remove only the entries in this cache's namespace. Returns the number
    /// of entries removed.
    pub async fn clear(&self) -> usize {
        let prefix = format!("{}_", self.settings.namespace);

        let removed: Vec<String> = {
            let mut entries = self.entries.write().await;
            let keys: Vec<String> = entries
                .keys()
                .filter(|k| k.starts_with(&prefix))
                .cloned()
                .collect();
            for key in &keys {
                entries.remove(key);
            }
            keys
        };

        for key in &removed {
            self.storage_remove(key).await;
        }

        // Persisted entries from earlier runs may not be in the index yet
        if let Ok(stored) = self.storage.keys().await {
            for key in stored.iter().filter(|k| k.starts_with(&prefix)) {
                if !removed.contains(key) {
                    self.storage_remove(key).await;
                }
            }
        }

        if !removed.is_empty() {
            info!("🧹 Cleared {} cache entries", removed.len());
        }
        removed.len()
    }

    /// Proactively purge expired entries. Lazy expiry on read remains the
    /// primary mechanism; this sweep is optional housekeeping.
    pub async fn sweep_expired(&self) -> usize {
        let now = now_ms();

        let expired: Vec<String> = {
            let entries = self.entries.read().await;
            entries
                .values()
                .filter(|e| e.is_expired(now))
                .map(|e| e.key.clone())
                .collect()
        };

        for key in &expired {
            self.remove_full_key(key).await;
        }

        if !expired.is_empty() {
            info!("🧹 Swept {} expired cache entries", expired.len());
        }
        expired.len()
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}_{}", self.settings.namespace, key)
    }

    async fn remove_full_key(&self, full_key: &str) -> bool {
        let removed = self.entries.write().await.remove(full_key).is_some();
        self.storage_remove(full_key).await;
        removed
    }

    /// Evict least-recently-used entries until the live size is under budget.
    /// Runs independently of TTL expiry.
    async fn evict_over_budget(&self) {
        loop {
            let victim = {
                let entries = self.entries.read().await;
                let total: u64 = entries.values().map(|e| e.size_bytes).sum();
                if total <= self.settings.max_size_bytes {
                    return;
                }
                entries
                    .values()
                    .min_by_key(|e| (e.last_accessed, e.key.clone()))
                    .map(|e| e.key.clone())
            };

            match victim {
                Some(key) => {
                    debug!("♻️ Evicting cache entry over budget: {}", key);
                    self.remove_full_key(&key).await;
                }
                None => return,
            }
        }
    }

    fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.settings.op_timeout_ms)
    }

    async fn storage_read(&self, key: &str) -> Option<String> {
        match timeout(self.op_timeout(), self.storage.read(key)).await {
            Ok(Ok(payload)) => payload,
            Ok(Err(e)) => {
                warn!("Cache storage read failed for {}: {}", key, e);
                None
            }
            Err(_) => {
                warn!("Cache storage read timed out for {}", key);
                None
            }
        }
    }

    async fn storage_write(&self, key: &str, payload: &str) {
        match timeout(self.op_timeout(), self.storage.write(key, payload)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Cache storage write failed for {}: {}", key, e),
            Err(_) => warn!("Cache storage write timed out for {}", key),
        }
    }

    async fn storage_remove(&self, key: &str) {
        match timeout(self.op_timeout(), self.storage.remove(key)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Cache storage remove failed for {}: {}", key, e),
            Err(_) => warn!("Cache storage remove timed out for {}", key),
        }
    }
}

/// Stable marker key for a preload URL; URLs are hashed so the key stays
/// filename-safe
fn preload_key(url: &str) -> String {
    let mut hasher = DefaultHasher::new();
    url.hash(&mut hasher);
    format!("preload_{:016x}", hasher.finish())
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
