use async_trait::async_trait;
use lingodrama::cache::{CacheSettings, FileStorage};
use lingodrama::content::{load_drama, ContentProvider, DramaContent};
use lingodrama::progress::InMemoryProgressStore;
use lingodrama::{
    ContentCache, EngineError, KeywordDefinition, PlaybackSynchronizer, ProgressRecord,
    ProgressStore, ProgressTracker, SubtitleTrack, SyncEvent, SyncState,
};
use std::sync::Arc;
use tempfile::TempDir;

fn sample_srt() -> String {
    [
        "1\n00:00:02,500 --> 00:00:05,000\nHello, welcome to the coffee shop",
        "2\n00:00:05,500 --> 00:00:08,000\nOne espresso please",
        "3\n00:00:08,500 --> 00:00:11,000\nThat will be trouble for my sleep",
    ]
    .join("\n\n")
}

fn keyword(id: &str, word: &str, start: f64, end: f64) -> KeywordDefinition {
    KeywordDefinition {
        id: id.to_string(),
        word: word.to_string(),
        translation: format!("{}-es", word),
        start_time: start,
        end_time: end,
        audio_url: None,
    }
}

fn sample_keywords() -> Vec<KeywordDefinition> {
    vec![
        keyword("kw-coffee", "coffee", 2.5, 5.0),
        keyword("kw-espresso", "espresso", 5.5, 8.0),
        keyword("kw-trouble", "trouble", 8.5, 11.0),
    ]
}

fn file_cache(temp_dir: &TempDir) -> ContentCache {
    let storage = FileStorage::new(temp_dir.path().to_path_buf());
    ContentCache::new(CacheSettings::default(), Arc::new(storage))
}

#[tokio::test]
async fn test_parse_sync_sighting_flow() {
    let mut sync = PlaybackSynchronizer::new();
    assert_eq!(sync.load(&sample_srt(), sample_keywords()), SyncState::Syncing);

    let mut sighted = Vec::new();
    let mut subtitles_seen = Vec::new();

    // Walk the drama at a 250ms tick like a player time-progress callback
    let mut position = 0.0;
    while position <= sync.track().duration() {
        for event in sync.tick(position) {
            match event {
                SyncEvent::KeywordSighted(id) => sighted.push(id),
                SyncEvent::ActiveSubtitleChanged(Some(interval)) => {
                    subtitles_seen.push(interval.id)
                }
                _ => {}
            }
        }
        position += 0.25;
    }

    assert_eq!(sighted, vec!["kw-coffee", "kw-espresso", "kw-trouble"]);
    assert_eq!(subtitles_seen, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_segmentation_of_active_subtitle() {
    let track = SubtitleTrack::parse(&sample_srt());
    let keywords = sample_keywords();

    let interval = track.current_interval_at(3.0).unwrap();
    let segments = lingodrama::KeywordMatcher::segment_text(&interval.text, &keywords);

    let rebuilt: String = segments.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(rebuilt, interval.text);

    let matched: Vec<_> = segments.iter().filter(|s| s.is_keyword).collect();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].keyword.as_ref().unwrap().id, "kw-coffee");
}

#[tokio::test]
async fn test_milestone_fires_once_for_fifteen_keyword_drama() {
    let store = InMemoryProgressStore::new();
    let mut tracker = ProgressTracker::new("user-1", "drama-15", 15, &[50]);

    let mut fifty_pct_firings = 0;
    for i in 0..15 {
        let update = tracker
            .submit_attempt(&store, &format!("kw-{}", i), true)
            .await
            .unwrap();
        if update.milestone.map(|m| m.threshold_pct) == Some(50) {
            fifty_pct_firings += 1;
            // Fires on the attempt that moves completions from 7 to 8
            assert_eq!(i, 7);
        }
    }

    assert_eq!(fifty_pct_firings, 1);
}

#[tokio::test]
async fn test_file_cache_round_trip_and_expiry() {
    let temp_dir = TempDir::new().unwrap();
    let cache = file_cache(&temp_dir);

    cache
        .set("drama_1", &"fresh payload".to_string(), 3600)
        .await;
    cache.set("drama_2", &"stale payload".to_string(), 0).await;

    let fresh: Option<String> = cache.get("drama_1").await;
    let stale: Option<String> = cache.get("drama_2").await;

    assert_eq!(fresh.unwrap(), "fresh payload");
    assert!(stale.is_none());
}

#[tokio::test]
async fn test_file_cache_survives_restart() {
    let temp_dir = TempDir::new().unwrap();

    {
        let cache = file_cache(&temp_dir);
        let drama = DramaContent {
            id: "d1".to_string(),
            title: "Coffee Shop Confessions".to_string(),
            description: None,
            video_url: "https://cdn.example/ep1.mp4".to_string(),
            subtitle_url: None,
        };
        cache.cache_drama_content(&drama, &sample_keywords()).await;
    }

    // New cache over the same directory, as after an app restart
    let cache = file_cache(&temp_dir);
    assert_eq!(cache.hydrate().await, 2);

    let drama = cache.get_drama("d1").await.unwrap();
    assert_eq!(drama.title, "Coffee Shop Confessions");

    let keywords = cache.get_keywords("d1").await.unwrap();
    assert_eq!(keywords.len(), 3);
}

#[tokio::test]
async fn test_cached_totals_feed_progress_tracker() {
    let temp_dir = TempDir::new().unwrap();
    let cache = file_cache(&temp_dir);

    let drama = DramaContent {
        id: "d1".to_string(),
        title: "Coffee Shop Confessions".to_string(),
        description: None,
        video_url: "https://cdn.example/ep1.mp4".to_string(),
        subtitle_url: None,
    };
    cache.cache_drama_content(&drama, &sample_keywords()).await;

    let mut tracker = ProgressTracker::with_cached_total("user-1", "d1", &cache, &[100])
        .await
        .expect("keyword total served from cache");

    // 3 cached keywords: completing all of them is the 100% milestone
    tracker.record_attempt("kw-coffee", true);
    tracker.record_attempt("kw-espresso", true);
    let last = tracker.record_attempt("kw-trouble", true);

    assert_eq!(last.milestone.unwrap().threshold_pct, 100);
}

struct FlakyStore {
    inner: InMemoryProgressStore,
    fail_upserts: std::sync::atomic::AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: InMemoryProgressStore::new(),
            fail_upserts: std::sync::atomic::AtomicBool::new(false),
        }
    }

    fn set_offline(&self, offline: bool) {
        self.fail_upserts
            .store(offline, std::sync::atomic::Ordering::SeqCst);
    }
}

#[async_trait]
impl ProgressStore for FlakyStore {
    async fn find(
        &self,
        user_id: &str,
        drama_id: &str,
        keyword_id: &str,
    ) -> lingodrama::Result<Option<ProgressRecord>> {
        self.inner.find(user_id, drama_id, keyword_id).await
    }

    async fn find_many(
        &self,
        user_id: &str,
        drama_id: &str,
    ) -> lingodrama::Result<Vec<ProgressRecord>> {
        self.inner.find_many(user_id, drama_id).await
    }

    async fn upsert(&self, record: ProgressRecord) -> lingodrama::Result<ProgressRecord> {
        if self.fail_upserts.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(EngineError::Persistence("network unreachable".to_string()));
        }
        self.inner.upsert(record).await
    }

    async fn watermark(
        &self,
        user_id: &str,
        drama_id: &str,
    ) -> lingodrama::Result<Option<lingodrama::progress::MilestoneWatermark>> {
        self.inner.watermark(user_id, drama_id).await
    }

    async fn save_watermark(
        &self,
        watermark: lingodrama::progress::MilestoneWatermark,
    ) -> lingodrama::Result<()> {
        self.inner.save_watermark(watermark).await
    }
}

#[tokio::test]
async fn test_submit_failure_rollback_then_retry() {
    let store = FlakyStore::new();
    let mut tracker = ProgressTracker::new("user-1", "drama-1", 5, &[100]);

    store.set_offline(true);
    let failure = tracker
        .submit_attempt(&store, "kw-coffee", true)
        .await
        .unwrap_err();

    // The caller gets the rollback state and decides; here we revert
    tracker.revert(&failure.update);
    assert!(tracker.record("kw-coffee").is_none());

    // Back online, the retry lands and persists
    store.set_offline(false);
    let update = tracker
        .submit_attempt(&store, "kw-coffee", true)
        .await
        .unwrap();
    assert_eq!(update.record.attempts, 1);

    let persisted = store
        .find("user-1", "drama-1", "kw-coffee")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(persisted.correct_attempts, 1);
}

struct StaticProvider;

#[async_trait]
impl ContentProvider for StaticProvider {
    async fn fetch_drama(&self, drama_id: &str) -> lingodrama::Result<DramaContent> {
        Ok(DramaContent {
            id: drama_id.to_string(),
            title: "Night Market".to_string(),
            description: Some("Street food and small talk".to_string()),
            video_url: "https://cdn.example/night-market.mp4".to_string(),
            subtitle_url: Some("https://cdn.example/night-market.srt".to_string()),
        })
    }

    async fn fetch_keywords(&self, _drama_id: &str) -> lingodrama::Result<Vec<KeywordDefinition>> {
        Ok(sample_keywords())
    }
}

#[tokio::test]
async fn test_load_drama_then_full_session_offline() {
    let temp_dir = TempDir::new().unwrap();
    let cache = file_cache(&temp_dir);

    // First launch: provider online, content cached
    let (drama, keywords) = load_drama(&StaticProvider, &cache, "d7").await.unwrap();
    assert_eq!(drama.id, "d7");

    // Preload the video and verify the marker
    cache.queue_video_preload(&drama.video_url).await;
    cache.process_preload_queue().await;
    assert!(cache.is_video_preloaded(&drama.video_url).await);

    // A playback session built entirely from cached content
    let mut sync = PlaybackSynchronizer::new();
    sync.load(&sample_srt(), keywords);
    assert_eq!(sync.state(), SyncState::Syncing);

    let events = sync.tick(6.0);
    assert!(events
        .iter()
        .any(|e| matches!(e, SyncEvent::KeywordSighted(id) if id == "kw-espresso")));
}
