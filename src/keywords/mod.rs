/// Vocabulary keyword definitions and occurrence matching
///
/// Finds and segments keyword occurrences inside subtitle text, and filters
/// keywords by their canonical subtitle time windows.

pub mod matcher;

pub use matcher::{KeywordDefinition, KeywordMatch, KeywordMatcher, TextSegment};
