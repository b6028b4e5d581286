use crate::cache::CacheSettings;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the learning engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Local content cache settings
    pub cache: CacheConfig,

    /// Playback synchronization settings
    pub playback: PlaybackConfig,

    /// Milestone celebration settings
    pub milestones: MilestoneConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Key namespace for this app's cache entries
    pub namespace: String,

    /// Directory for the file-backed cache
    pub cache_dir: PathBuf,

    /// Total size budget for live entries, bytes
    pub max_size_bytes: u64,

    /// Default TTL for cached drama/keyword payloads, seconds
    pub default_ttl_seconds: u64,

    /// TTL for video preload markers, seconds
    pub preload_ttl_seconds: u64,

    /// Bound on a single storage operation, milliseconds
    pub op_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Interval between simulated playback ticks, milliseconds
    pub tick_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneConfig {
    /// Completion percentages that trigger a celebration, ascending
    pub thresholds_pct: Vec<u8>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig {
                namespace: "lingodrama".to_string(),
                cache_dir: PathBuf::from(".lingodrama_cache"),
                max_size_bytes: 10 * 1024 * 1024,
                default_ttl_seconds: 3600,
                preload_ttl_seconds: 1800,
                op_timeout_ms: 250,
            },
            playback: PlaybackConfig {
                tick_interval_ms: 250,
            },
            milestones: MilestoneConfig {
                thresholds_pct: vec![25, 50, 100],
            },
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to environment overrides
    pub fn load() -> Result<Self> {
        let config_paths = [
            "lingodrama.toml",
            "config/lingodrama.toml",
            "~/.config/lingodrama/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Ok(Self::from_env())
    }

    /// Build configuration from defaults plus environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(cache_dir) = std::env::var("LINGODRAMA_CACHE_DIR") {
            config.cache.cache_dir = PathBuf::from(cache_dir);
        }

        if let Ok(namespace) = std::env::var("LINGODRAMA_NAMESPACE") {
            config.cache.namespace = namespace;
        }

        if let Ok(budget) = std::env::var("LINGODRAMA_CACHE_BUDGET") {
            config.cache.max_size_bytes = budget.parse().unwrap_or(config.cache.max_size_bytes);
        }

        if let Ok(ttl) = std::env::var("LINGODRAMA_CACHE_TTL") {
            config.cache.default_ttl_seconds =
                ttl.parse().unwrap_or(config.cache.default_ttl_seconds);
        }

        config
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.cache.namespace.trim().is_empty() {
            return Err(anyhow!("cache.namespace must not be empty"));
        }
        if !self
            .cache
            .namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(anyhow!(
                "cache.namespace must be alphanumeric (got {:?})",
                self.cache.namespace
            ));
        }
        if self.cache.max_size_bytes == 0 {
            return Err(anyhow!("cache.max_size_bytes must be greater than 0"));
        }
        if self.cache.op_timeout_ms == 0 {
            return Err(anyhow!("cache.op_timeout_ms must be greater than 0"));
        }
        if self.playback.tick_interval_ms == 0 {
            return Err(anyhow!("playback.tick_interval_ms must be greater than 0"));
        }
        if self.milestones.thresholds_pct.is_empty() {
            return Err(anyhow!("milestones.thresholds_pct must not be empty"));
        }
        if self
            .milestones
            .thresholds_pct
            .iter()
            .any(|&pct| pct == 0 || pct > 100)
        {
            return Err(anyhow!("milestone thresholds must be within 1..=100"));
        }

        Ok(())
    }

    /// Cache settings view consumed by `ContentCache`
    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            namespace: self.cache.namespace.clone(),
            max_size_bytes: self.cache.max_size_bytes,
            default_ttl_seconds: self.cache.default_ttl_seconds,
            preload_ttl_seconds: self.cache.preload_ttl_seconds,
            op_timeout_ms: self.cache.op_timeout_ms,
        }
    }
}
