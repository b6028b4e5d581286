/// Subtitle timeline parsing and time-indexed lookup
///
/// Consumes SRT-style time-coded text and produces an ordered, validated
/// sequence of subtitle intervals that the playback synchronizer queries by
/// playback position.

pub mod parser;

pub use parser::{format_timestamp, SubtitleInterval, SubtitleTrack};
