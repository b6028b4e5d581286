use anyhow::Result;
use clap::{Parser, Subcommand};
use lingodrama::cache::{CacheSettings, FileStorage};
use lingodrama::ContentCache;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "cache-manager")]
#[command(about = "Content cache maintenance utility")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, default_value = ".lingodrama_cache")]
    cache_dir: PathBuf,

    #[arg(long, default_value = "lingodrama")]
    namespace: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Get cache statistics
    Stats,
    /// List all cached entries
    List,
    /// Purge expired entries
    Cleanup,
    /// Clear all entries in this namespace
    Clear,
    /// Remove a specific entry by key (without the namespace prefix)
    Invalidate {
        /// Cache key to invalidate, e.g. "drama_42"
        key: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt().with_env_filter("info").init();

    let cli = Cli::parse();

    let storage = FileStorage::new(cli.cache_dir.clone());
    storage.initialize().await?;

    let settings = CacheSettings {
        namespace: cli.namespace.clone(),
        ..CacheSettings::default()
    };
    let cache = ContentCache::new(settings, Arc::new(storage));
    cache.hydrate().await;

    match cli.command {
        Commands::Stats => {
            let stats = cache.stats().await;
            info!("🗄️ Cache statistics for namespace '{}':", cli.namespace);
            info!("  Live entries: {}", stats.item_count);
            info!("  Total size:   {} bytes", stats.size_bytes);
            info!("  Preload queue: {}", stats.preload_queue_size);
        }
        Commands::List => {
            let entries = cache.list_entries().await;

            if entries.is_empty() {
                info!("📭 No cached entries found");
                return Ok(());
            }

            info!("📚 Found {} cached entries:", entries.len());
            for entry in entries {
                let status = if entry.is_expired {
                    "❌ Expired"
                } else {
                    "✅ Valid"
                };
                info!(
                    "  {} - {} bytes, {}s old, {} reads, {}",
                    entry.key, entry.size_bytes, entry.age_seconds, entry.access_count, status
                );
            }
        }
        Commands::Cleanup => {
            let removed = cache.sweep_expired().await;
            info!("🧹 Removed {} expired entries", removed);
        }
        Commands::Clear => {
            let removed = cache.clear().await;
            info!("🧹 Cleared {} entries from namespace '{}'", removed, cli.namespace);
        }
        Commands::Invalidate { key } => {
            if cache.remove(&key).await {
                info!("🗑️ Invalidated cache entry: {}", key);
            } else {
                info!("Cache entry not found: {}", key);
            }
        }
    }

    Ok(())
}
