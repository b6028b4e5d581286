//! Playback synchronization between video time and learning content
//!
//! Consumes a parsed subtitle timeline, a keyword set, and a live playback
//! position signal, and emits active-subtitle/active-keyword changes and
//! keyword sighting events. State for a tick is recomputed from scratch from
//! the timestamp, so out-of-order or repeated ticks (seeks, loops) never
//! corrupt the displayed state.

use crate::content::SubtitleSource;
use crate::keywords::{KeywordDefinition, KeywordMatcher};
use crate::subtitle::{SubtitleInterval, SubtitleTrack};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Synchronizer lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No timeline loaded yet
    Idle,
    /// Timeline and keywords loaded; ticks produce events
    Syncing,
    /// Subtitle loading or parsing failed; playback continues without
    /// highlighting until a fresh load succeeds
    Degraded,
}

/// Observable signal emitted by a tick
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// The active subtitle interval changed (None = between intervals)
    ActiveSubtitleChanged(Option<SubtitleInterval>),
    /// The set of active keyword ids changed
    ActiveKeywordsChanged(BTreeSet<String>),
    /// A keyword entered the active set. Informational only; unlocking
    /// requires an explicit exercise answer, never a sighting.
    KeywordSighted(String),
}

/// Media-synchronized subtitle/keyword tracker
pub struct PlaybackSynchronizer {
    state: SyncState,
    track: SubtitleTrack,
    keywords: Vec<KeywordDefinition>,
    active_subtitle: Option<SubtitleInterval>,
    active_keywords: BTreeSet<String>,
}

impl PlaybackSynchronizer {
    pub fn new() -> Self {
        Self {
            state: SyncState::Idle,
            track: SubtitleTrack::default(),
            keywords: Vec::new(),
            active_subtitle: None,
            active_keywords: BTreeSet::new(),
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn track(&self) -> &SubtitleTrack {
        &self.track
    }

    /// Load raw subtitle text and a keyword set. A malformed document (or one
    /// yielding no intervals) degrades the synchronizer instead of erroring:
    /// playback must never block on subtitles. A later successful load leaves
    /// the degraded state.
    pub fn load(&mut self, raw_subtitles: &str, keywords: Vec<KeywordDefinition>) -> SyncState {
        if !SubtitleTrack::is_well_formed(raw_subtitles) {
            warn!("🚫 Subtitle document is malformed; continuing without highlighting");
            self.state = SyncState::Degraded;
            return self.state;
        }

        let track = SubtitleTrack::parse(raw_subtitles);
        if track.is_empty() {
            warn!("🚫 Subtitle document produced no intervals; continuing without highlighting");
            self.state = SyncState::Degraded;
            return self.state;
        }

        let valid_keywords: Vec<KeywordDefinition> = keywords
            .into_iter()
            .filter(|k| KeywordMatcher::validate_keyword(k).is_ok())
            .collect();

        info!(
            "🎬 Synchronizer loaded: {} intervals, {} keywords, {:.1}s",
            track.total_count(),
            valid_keywords.len(),
            track.duration()
        );

        self.track = track;
        self.keywords = valid_keywords;
        self.active_subtitle = None;
        self.active_keywords = BTreeSet::new();
        self.state = SyncState::Syncing;
        self.state
    }

    /// Fetch subtitles from a source and load them. Fetch errors are caught
    /// and logged; the synchronizer degrades and the error never propagates.
    pub async fn load_from_source(
        &mut self,
        source: &dyn SubtitleSource,
        subtitle_url: &str,
        keywords: Vec<KeywordDefinition>,
    ) -> SyncState {
        match source.fetch(subtitle_url).await {
            Ok(raw) => self.load(&raw, keywords),
            Err(e) => {
                warn!(
                    "🚫 Subtitle fetch failed ({}); continuing without highlighting",
                    e
                );
                self.state = SyncState::Degraded;
                self.state
            }
        }
    }

    /// Process one playback-time tick. The position signal is periodic but
    /// not monotonic; seeks and loops rewind it. Active state is a pure
    /// function of the timestamp, so repeated or out-of-order ticks are safe.
    ///
    /// Events are emitted only when a value differs from the previous tick.
    pub fn tick(&mut self, position_secs: f64) -> Vec<SyncEvent> {
        if self.state != SyncState::Syncing {
            return Vec::new();
        }

        let current = self.track.current_interval_at(position_secs).cloned();
        let active: BTreeSet<String> =
            KeywordMatcher::filter_by_time_window(&self.keywords, position_secs, position_secs)
                .into_iter()
                .map(|k| k.id)
                .collect();

        let mut events = Vec::new();

        if current != self.active_subtitle {
            debug!(
                "Active subtitle -> {:?} at {:.2}s",
                current.as_ref().map(|i| i.id),
                position_secs
            );
            events.push(SyncEvent::ActiveSubtitleChanged(current.clone()));
            self.active_subtitle = current;
        }

        if active != self.active_keywords {
            events.push(SyncEvent::ActiveKeywordsChanged(active.clone()));
            for id in active.difference(&self.active_keywords) {
                events.push(SyncEvent::KeywordSighted(id.clone()));
            }
            self.active_keywords = active;
        }

        events
    }
}

impl Default for PlaybackSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}
