use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use tracing::debug;

/// A single time-coded subtitle interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleInterval {
    /// Sequential index from the source block
    pub id: u32,
    /// Start time in seconds
    pub start_time: f64,
    /// End time in seconds
    pub end_time: f64,
    /// Subtitle text (joined text lines)
    pub text: String,
}

impl SubtitleInterval {
    /// Whether this interval contains the given playback position
    pub fn contains(&self, t: f64) -> bool {
        self.start_time <= t && t <= self.end_time
    }

    /// Whether this interval overlaps the given time window
    pub fn intersects(&self, start: f64, end: f64) -> bool {
        self.start_time <= end && self.end_time >= start
    }
}

impl fmt::Display for SubtitleInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{} --> {}\n{}\n",
            self.id,
            format_timestamp(self.start_time),
            format_timestamp(self.end_time),
            self.text
        )
    }
}

/// Parsed subtitle timeline, sorted ascending by start time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubtitleTrack {
    intervals: Vec<SubtitleInterval>,
    duration: f64,
}

impl SubtitleTrack {
    /// Parse raw SRT-style text into an ordered timeline.
    ///
    /// Blocks are separated by blank lines (`\r\n` and `\r` tolerated). Each
    /// block is expected to carry an index line, a time-range line
    /// (`HH:MM:SS,mmm --> HH:MM:SS,mmm`) and at least one text line. Blocks
    /// with fewer than 3 lines or a malformed time range are dropped and
    /// parsing continues.
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");
        let mut intervals = Vec::new();

        for block in normalized.split("\n\n") {
            let block = block.trim();
            if block.is_empty() {
                continue;
            }
            match parse_block(block) {
                Some(interval) => intervals.push(interval),
                None => debug!("Dropped malformed subtitle block: {:?}", first_line(block)),
            }
        }

        // Source blocks can arrive out of order
        intervals.sort_by(|a, b| {
            a.start_time
                .partial_cmp(&b.start_time)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let duration = intervals.iter().map(|i| i.end_time).fold(0.0, f64::max);

        Self { intervals, duration }
    }

    /// Cheap validity probe: does the input contain at least one well-formed
    /// time-range line? Does not run a full parse.
    pub fn is_well_formed(raw: &str) -> bool {
        time_range_regex().is_match(raw)
    }

    /// All parsed intervals, ascending by start time
    pub fn intervals(&self) -> &[SubtitleInterval] {
        &self.intervals
    }

    /// Number of parsed intervals
    pub fn total_count(&self) -> usize {
        self.intervals.len()
    }

    /// Max end time across all intervals, 0 if none parsed
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// The interval containing time `t`, or `None` if no interval covers it.
    /// When intervals improperly overlap, the one with the smallest start
    /// time wins.
    pub fn current_interval_at(&self, t: f64) -> Option<&SubtitleInterval> {
        self.intervals.iter().find(|i| i.contains(t))
    }

    /// All intervals overlapping the `[start, end]` window
    pub fn intervals_intersecting(&self, start: f64, end: f64) -> Vec<&SubtitleInterval> {
        self.intervals
            .iter()
            .filter(|i| i.intersects(start, end))
            .collect()
    }

    /// Report non-fatal issues in the parsed timeline
    pub fn lint(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for (i, interval) in self.intervals.iter().enumerate() {
            if interval.end_time <= interval.start_time {
                issues.push(format!("Interval {}: end time is not after start time", i + 1));
            }
            if interval.text.trim().is_empty() {
                issues.push(format!("Interval {}: empty text", i + 1));
            }
        }

        for pair in self.intervals.windows(2) {
            if pair[0].end_time > pair[1].start_time {
                issues.push(format!(
                    "Intervals {} and {}: overlapping timestamps",
                    pair[0].id, pair[1].id
                ));
            }
        }

        issues
    }
}

/// Parse a single subtitle block: index line, time-range line, text lines
fn parse_block(block: &str) -> Option<SubtitleInterval> {
    let lines: Vec<&str> = block.lines().collect();
    if lines.len() < 3 {
        return None;
    }

    let captures = time_range_regex().captures(lines[1])?;

    let start_time = timestamp_to_seconds(&captures, 1);
    let end_time = timestamp_to_seconds(&captures, 5);
    let id = lines[0].trim().parse().unwrap_or(0);
    let text = lines[2..].join("\n").trim().to_string();

    Some(SubtitleInterval {
        id,
        start_time,
        end_time,
        text,
    })
}

/// Convert one side of a matched time range to seconds
fn timestamp_to_seconds(captures: &regex::Captures<'_>, first_group: usize) -> f64 {
    let field = |offset: usize| -> f64 {
        captures
            .get(first_group + offset)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(0.0)
    };
    field(0) * 3600.0 + field(1) * 60.0 + field(2) + field(3) / 1000.0
}

fn time_range_regex() -> &'static Regex {
    static TIME_RANGE: OnceLock<Regex> = OnceLock::new();
    TIME_RANGE.get_or_init(|| {
        Regex::new(r"(\d{2}):(\d{2}):(\d{2}),(\d{3})\s*-->\s*(\d{2}):(\d{2}):(\d{2}),(\d{3})")
            .expect("time range pattern is valid")
    })
}

fn first_line(block: &str) -> &str {
    block.lines().next().unwrap_or("")
}

/// Format seconds as an SRT timestamp (HH:MM:SS,mmm)
pub fn format_timestamp(seconds: f64) -> String {
    let total_millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let millis = total_millis % 1000;
    let total_seconds = total_millis / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}
