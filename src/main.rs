use anyhow::{Context, Result};
use clap::{Arg, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use lingodrama::cache::FileStorage;
use lingodrama::progress::InMemoryProgressStore;
use lingodrama::{
    Config, ContentCache, KeywordDefinition, PlaybackSynchronizer, ProgressTracker, SyncEvent,
    SyncState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("lingodrama=info,warn")
        .init();

    let matches = Command::new("LingoDrama")
        .version("0.1.0")
        .about("Media-synchronized vocabulary learning engine")
        .arg(
            Arg::new("subtitles")
                .short('s')
                .long("subtitles")
                .value_name("FILE")
                .help("SRT subtitle file for the drama")
                .required(true),
        )
        .arg(
            Arg::new("keywords")
                .short('k')
                .long("keywords")
                .value_name("FILE")
                .help("JSON file with the drama's keyword definitions"),
        )
        .arg(
            Arg::new("step-ms")
                .long("step-ms")
                .value_name("MS")
                .help("Simulated playback tick step in milliseconds"),
        )
        .arg(
            Arg::new("user")
                .short('u')
                .long("user")
                .value_name("ID")
                .help("User id for the simulated session")
                .default_value("demo-user"),
        )
        .arg(
            Arg::new("drama")
                .short('d')
                .long("drama")
                .value_name("ID")
                .help("Drama id for the simulated session")
                .default_value("demo-drama"),
        )
        .get_matches();

    let subtitle_path = PathBuf::from(matches.get_one::<String>("subtitles").unwrap());
    let keyword_path = matches.get_one::<String>("keywords").map(PathBuf::from);
    let user_id = matches.get_one::<String>("user").unwrap();
    let drama_id = matches.get_one::<String>("drama").unwrap();

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });
    config.validate().context("invalid configuration")?;

    let step_ms: u64 = match matches.get_one::<String>("step-ms") {
        Some(raw) => raw.parse().context("invalid --step-ms")?,
        None => config.playback.tick_interval_ms,
    };
    if step_ms == 0 {
        anyhow::bail!("--step-ms must be greater than 0");
    }

    info!("🎬 LingoDrama session starting");
    info!("📄 Subtitles: {}", subtitle_path.display());

    // Local content cache, file-backed
    let storage = FileStorage::new(config.cache.cache_dir.clone());
    storage.initialize().await?;
    let cache = ContentCache::new(config.cache_settings(), Arc::new(storage));
    cache.hydrate().await;

    // Keyword definitions for the drama
    let keywords: Vec<KeywordDefinition> = match &keyword_path {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
        }
        None => Vec::new(),
    };
    info!("📚 {} keyword definitions loaded", keywords.len());

    // Keep the keyword list warm for the next session
    if !keywords.is_empty() {
        cache
            .set(
                &format!("keywords_{}", drama_id),
                &keywords,
                config.cache.default_ttl_seconds,
            )
            .await;
    }

    // Subtitle timeline
    let raw_subtitles = tokio::fs::read_to_string(&subtitle_path)
        .await
        .with_context(|| format!("reading {}", subtitle_path.display()))?;

    let mut synchronizer = PlaybackSynchronizer::new();
    if synchronizer.load(&raw_subtitles, keywords.clone()) == SyncState::Degraded {
        warn!("Subtitle document unusable; session runs without highlighting");
    }

    for issue in synchronizer.track().lint() {
        warn!("Subtitle issue: {}", issue);
    }

    // Simulated playback: walk the timeline at a fixed tick step and print
    // the events a player would receive
    let duration = synchronizer.track().duration();
    let step = step_ms as f64 / 1000.0;
    let mut sighted: Vec<String> = Vec::new();

    let mut position = 0.0;
    while position <= duration {
        for event in synchronizer.tick(position) {
            match event {
                SyncEvent::ActiveSubtitleChanged(Some(interval)) => {
                    info!("💬 [{:7.2}s] {}", position, interval.text.replace('\n', " "));
                }
                SyncEvent::ActiveSubtitleChanged(None) => {}
                SyncEvent::ActiveKeywordsChanged(_) => {}
                SyncEvent::KeywordSighted(id) => {
                    info!("👀 [{:7.2}s] keyword sighted: {}", position, id);
                    sighted.push(id);
                }
            }
        }
        position += step;
    }

    info!(
        "🏁 Playback finished: {:.1}s, {} subtitles, {} keyword sightings",
        duration,
        synchronizer.track().total_count(),
        sighted.len()
    );

    // Simulated exercise session: answer each sighted keyword correctly and
    // watch the milestones fire
    if !sighted.is_empty() {
        let store = InMemoryProgressStore::new();
        let mut tracker = ProgressTracker::new(
            user_id,
            drama_id,
            keywords.len(),
            &config.milestones.thresholds_pct,
        );

        for keyword_id in &sighted {
            match tracker.submit_attempt(&store, keyword_id, true).await {
                Ok(update) => {
                    if let Some(milestone) = update.milestone {
                        info!(
                            "🎉 Milestone: {}% of drama {} complete",
                            milestone.threshold_pct, drama_id
                        );
                    }
                }
                Err(failure) => {
                    warn!("Attempt not persisted, rolling back: {}", failure);
                    tracker.revert(&failure.update);
                }
            }
        }

        let stats = tracker.stats();
        info!(
            "📊 Session: {}/{} keywords completed, accuracy {:.0}%",
            stats.completed_keywords, stats.total_keywords, stats.accuracy_pct
        );
    }

    let cache_stats = cache.stats().await;
    info!(
        "🗄️ Cache: {} entries, {} bytes",
        cache_stats.item_count, cache_stats.size_bytes
    );

    Ok(())
}
