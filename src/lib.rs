/// LingoDrama - Media-synchronized learning engine
///
/// Core engine for vocabulary learning through video micro-dramas: subtitle
/// timeline parsing, keyword occurrence matching, playback synchronization,
/// TTL/size-bounded local content caching, and per-keyword learning progress
/// with milestone detection.

pub mod cache;
pub mod config;
pub mod content;
pub mod keywords;
pub mod playback;
pub mod progress;
pub mod subtitle;

// Re-export main types for easy access
pub use crate::cache::{CacheStats, ContentCache, FileStorage, MemoryStorage};
pub use crate::config::Config;
pub use crate::content::{ContentProvider, DramaContent, SubtitleSource};
pub use crate::keywords::{KeywordDefinition, KeywordMatch, KeywordMatcher, TextSegment};
pub use crate::playback::{PlaybackSynchronizer, SyncEvent, SyncState};
pub use crate::progress::{
    AttemptUpdate, KeywordStatus, MilestoneEvent, ProgressRecord, ProgressStore, ProgressTracker,
};
pub use crate::subtitle::{SubtitleInterval, SubtitleTrack};

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Error types for engine operations
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed subtitle data: {0}")]
    SubtitleParse(String),

    #[error("Invalid keyword definition: {0}")]
    InvalidKeyword(String),

    #[error("Cache storage error: {0}")]
    CacheStorage(String),

    #[error("Content fetch failed: {0}")]
    ContentFetch(String),

    #[error("Progress persistence failed: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
