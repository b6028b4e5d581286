use super::store::ProgressStore;
use super::{KeywordStatus, MilestoneEvent, MilestoneWatermark, ProgressRecord};
use crate::cache::ContentCache;
use crate::EngineError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Outcome of one recorded attempt: the optimistic new state plus everything
/// needed to roll it back if the persistence leg fails.
#[derive(Debug, Clone)]
pub struct AttemptUpdate {
    /// The record after the attempt
    pub record: ProgressRecord,
    /// The record before the attempt; `None` if this was the first attempt
    pub previous: Option<ProgressRecord>,
    /// The watermark before the attempt
    pub previous_watermark: MilestoneWatermark,
    /// Milestone crossed by this attempt, if any
    pub milestone: Option<MilestoneEvent>,
}

/// Progress submission failure carrying the rollback-capable update, so the
/// caller can retry or revert. The user's answer is never silently dropped.
#[derive(thiserror::Error, Debug)]
#[error("progress submission failed: {error}")]
pub struct SubmitError {
    pub error: EngineError,
    pub update: AttemptUpdate,
}

/// Derived statistics over a tracker's records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStats {
    pub total_attempts: u32,
    pub total_correct: u32,
    pub completed_keywords: usize,
    pub total_keywords: usize,
    /// `total_correct / total_attempts * 100`, 0 when there are no attempts
    pub accuracy_pct: f64,
    /// `completed_keywords / total_keywords * 100`, 0 when the drama is empty
    pub completion_rate_pct: f64,
}

/// Per-user, per-drama progress state machine.
///
/// Attempts for the same keyword must serialize through one logical owner;
/// `&mut self` enforces a single in-flight attempt at a time and prevents
/// lost updates on the counters.
pub struct ProgressTracker {
    user_id: String,
    drama_id: String,
    total_keywords: usize,
    /// Ascending, deduplicated threshold percentages
    thresholds_pct: Vec<u8>,
    records: HashMap<String, ProgressRecord>,
    watermark: MilestoneWatermark,
}

impl ProgressTracker {
    pub fn new(
        user_id: &str,
        drama_id: &str,
        total_keywords: usize,
        thresholds_pct: &[u8],
    ) -> Self {
        let mut thresholds: Vec<u8> = thresholds_pct.to_vec();
        thresholds.sort_unstable();
        thresholds.dedup();

        Self {
            user_id: user_id.to_string(),
            drama_id: drama_id.to_string(),
            total_keywords,
            thresholds_pct: thresholds,
            records: HashMap::new(),
            watermark: MilestoneWatermark {
                user_id: user_id.to_string(),
                drama_id: drama_id.to_string(),
                highest_threshold_reached: 0,
            },
        }
    }

    /// Build a tracker whose keyword total comes from the cached keyword list
    /// (`keywords_<drama_id>`), avoiding a refetch. `None` when the cache has
    /// no live entry; the caller falls back to fetching.
    pub async fn with_cached_total(
        user_id: &str,
        drama_id: &str,
        cache: &ContentCache,
        thresholds_pct: &[u8],
    ) -> Option<Self> {
        let keywords = cache.get_keywords(drama_id).await?;
        debug!(
            "📦 Keyword total for drama {} served from cache: {}",
            drama_id,
            keywords.len()
        );
        Some(Self::new(user_id, drama_id, keywords.len(), thresholds_pct))
    }

    /// Restore records and the milestone watermark from the persistence
    /// collaborator. Store errors leave the tracker empty but usable.
    pub async fn hydrate(&mut self, store: &dyn ProgressStore) {
        match store.find_many(&self.user_id, &self.drama_id).await {
            Ok(records) => {
                for record in records {
                    self.records.insert(record.keyword_id.clone(), record);
                }
            }
            Err(e) => warn!("Progress hydration failed: {}", e),
        }

        match store.watermark(&self.user_id, &self.drama_id).await {
            Ok(Some(watermark)) => self.watermark = watermark,
            Ok(None) => {}
            Err(e) => warn!("Watermark hydration failed: {}", e),
        }
    }

    /// Record one exercise attempt. Attempting a keyword for the first time
    /// unlocks it regardless of correctness; the first correct attempt
    /// completes it. Status never regresses.
    pub fn record_attempt(&mut self, keyword_id: &str, is_correct: bool) -> AttemptUpdate {
        let previous = self.records.get(keyword_id).cloned();
        let previous_watermark = self.watermark.clone();

        let mut record = previous.clone().unwrap_or_else(|| ProgressRecord {
            user_id: self.user_id.clone(),
            drama_id: self.drama_id.clone(),
            keyword_id: keyword_id.to_string(),
            status: KeywordStatus::Unlocked,
            attempts: 0,
            correct_attempts: 0,
            completed_at: None,
        });

        record.attempts += 1;
        if record.status == KeywordStatus::Locked {
            record.status = KeywordStatus::Unlocked;
        }
        if is_correct {
            record.correct_attempts += 1;
            if record.status != KeywordStatus::Completed {
                record.status = KeywordStatus::Completed;
                record.completed_at = Some(Utc::now());
            }
        }

        self.records.insert(keyword_id.to_string(), record.clone());

        let milestone = self.check_milestones();
        if let Some(m) = &milestone {
            info!(
                "🎉 Milestone reached for drama {}: {}% ({}/{} keywords)",
                self.drama_id, m.threshold_pct, m.completed_keywords, m.total_keywords
            );
        }

        AttemptUpdate {
            record,
            previous,
            previous_watermark,
            milestone,
        }
    }

    /// Record an attempt locally, then persist it. The optimistic local state
    /// is visible immediately; on store failure the rollback-capable update
    /// is returned inside the error and the caller decides retry vs. revert.
    pub async fn submit_attempt(
        &mut self,
        store: &dyn ProgressStore,
        keyword_id: &str,
        is_correct: bool,
    ) -> Result<AttemptUpdate, SubmitError> {
        let update = self.record_attempt(keyword_id, is_correct);

        if let Err(error) = store.upsert(update.record.clone()).await {
            warn!(
                "Progress upsert failed for keyword {}: {}",
                keyword_id, error
            );
            return Err(SubmitError { error, update });
        }

        if update.milestone.is_some() {
            if let Err(e) = store.save_watermark(self.watermark.clone()).await {
                warn!("Watermark persist failed: {}", e);
            }
        }

        Ok(update)
    }

    /// Roll the tracker back to the state captured in an update. Used when
    /// the caller gives up on persisting an attempt.
    pub fn revert(&mut self, update: &AttemptUpdate) {
        match &update.previous {
            Some(previous) => {
                self.records
                    .insert(previous.keyword_id.clone(), previous.clone());
            }
            None => {
                self.records.remove(&update.record.keyword_id);
            }
        }
        self.watermark = update.previous_watermark.clone();
        debug!(
            "↩️ Reverted attempt for keyword {}",
            update.record.keyword_id
        );
    }

    /// Fire the highest threshold newly crossed by the current completion
    /// count, advancing the watermark past any lower thresholds crossed in
    /// the same step. Each threshold fires at most once.
    fn check_milestones(&mut self) -> Option<MilestoneEvent> {
        if self.total_keywords == 0 {
            return None;
        }

        let completed = self.completed_keywords();
        let mut fired = None;

        for &pct in &self.thresholds_pct {
            if pct <= self.watermark.highest_threshold_reached {
                continue;
            }
            if completed >= required_completions(self.total_keywords, pct) {
                self.watermark.highest_threshold_reached = pct;
                fired = Some(MilestoneEvent {
                    threshold_pct: pct,
                    completed_keywords: completed,
                    total_keywords: self.total_keywords,
                });
            }
        }

        fired
    }

    pub fn record(&self, keyword_id: &str) -> Option<&ProgressRecord> {
        self.records.get(keyword_id)
    }

    pub fn completed_keywords(&self) -> usize {
        self.records
            .values()
            .filter(|r| r.status == KeywordStatus::Completed)
            .count()
    }

    pub fn watermark(&self) -> &MilestoneWatermark {
        &self.watermark
    }

    pub fn stats(&self) -> ProgressStats {
        let total_attempts: u32 = self.records.values().map(|r| r.attempts).sum();
        let total_correct: u32 = self.records.values().map(|r| r.correct_attempts).sum();
        let completed = self.completed_keywords();

        let accuracy_pct = if total_attempts == 0 {
            0.0
        } else {
            f64::from(total_correct) / f64::from(total_attempts) * 100.0
        };
        let completion_rate_pct = if self.total_keywords == 0 {
            0.0
        } else {
            completed as f64 / self.total_keywords as f64 * 100.0
        };

        ProgressStats {
            total_attempts,
            total_correct,
            completed_keywords: completed,
            total_keywords: self.total_keywords,
            accuracy_pct,
            completion_rate_pct,
        }
    }
}

/// Completions needed to reach `pct`% of `total`, rounding up
fn required_completions(total: usize, pct: u8) -> usize {
    (total * pct as usize).div_ceil(100)
}
