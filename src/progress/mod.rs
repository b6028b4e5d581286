/// Per-keyword learning progress and milestone detection
///
/// Maintains the unlock/completion state machine for each keyword a user
/// attempts, per-drama milestone watermarks, and derived statistics. The
/// in-memory tracker is the authoritative optimistic copy; a `ProgressStore`
/// collaborator is the cross-device source of truth.

pub mod store;
pub mod tracker;

pub use store::{InMemoryProgressStore, ProgressStore};
pub use tracker::{AttemptUpdate, ProgressStats, ProgressTracker, SubmitError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Keyword learning status. Transitions are monotonic:
/// `Locked -> Unlocked -> Completed`, never backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordStatus {
    Locked,
    Unlocked,
    Completed,
}

/// Progress for one `(user, drama, keyword)` triple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub user_id: String,
    pub drama_id: String,
    pub keyword_id: String,
    pub status: KeywordStatus,
    pub attempts: u32,
    pub correct_attempts: u32,
    /// Set exactly once, at the attempt that first completes the keyword
    pub completed_at: Option<DateTime<Utc>>,
}

/// Highest milestone threshold already celebrated for a user and drama.
/// Guarantees each threshold fires at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneWatermark {
    pub user_id: String,
    pub drama_id: String,
    /// Threshold percentage already reached; 0 = none
    pub highest_threshold_reached: u8,
}

/// One-time celebration event for crossing a completion threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneEvent {
    pub threshold_pct: u8,
    pub completed_keywords: usize,
    pub total_keywords: usize,
}
