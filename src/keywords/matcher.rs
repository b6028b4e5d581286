use crate::{EngineError, Result};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A vocabulary keyword with its canonical subtitle time window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordDefinition {
    pub id: String,
    /// The vocabulary word as it appears in subtitle text
    pub word: String,
    pub translation: String,
    /// Start of the keyword's subtitle window, seconds
    pub start_time: f64,
    /// End of the keyword's subtitle window, seconds
    pub end_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

impl KeywordDefinition {
    /// Whether this keyword's window intersects the `[start, end]` window.
    /// Covers all three cases: fully inside, partially overlapping from
    /// either side, and fully containing the window.
    pub fn intersects(&self, start: f64, end: f64) -> bool {
        self.start_time <= end && self.end_time >= start
    }
}

/// One keyword occurrence inside a text
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordMatch {
    pub keyword: KeywordDefinition,
    /// Byte offset of the match start
    pub start_index: usize,
    /// Byte offset one past the match end
    pub end_index: usize,
    /// The matched text as it appeared in the input
    pub matched_text: String,
}

/// A span of text, either plain or a keyword occurrence. The ordered
/// concatenation of segment texts reproduces the input exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSegment {
    pub text: String,
    pub is_keyword: bool,
    pub keyword: Option<KeywordDefinition>,
}

impl TextSegment {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            is_keyword: false,
            keyword: None,
        }
    }

    fn matched(text: &str, keyword: &KeywordDefinition) -> Self {
        Self {
            text: text.to_string(),
            is_keyword: true,
            keyword: Some(keyword.clone()),
        }
    }
}

/// Keyword matching utilities
pub struct KeywordMatcher;

impl KeywordMatcher {
    /// Find all keyword occurrences in `text`, sorted by start index.
    ///
    /// Matching is case-insensitive and whole-word. Keyword text is escaped
    /// before the pattern is built, so metacharacters in vocabulary never
    /// corrupt matching. Invalid keywords are excluded rather than raising.
    pub fn find_matches(text: &str, keywords: &[KeywordDefinition]) -> Vec<KeywordMatch> {
        let mut matches = Vec::new();

        for keyword in valid_keywords(keywords) {
            let regex = match word_regex(&keyword.word) {
                Some(r) => r,
                None => continue,
            };
            for m in regex.find_iter(text) {
                matches.push(KeywordMatch {
                    keyword: keyword.clone(),
                    start_index: m.start(),
                    end_index: m.end(),
                    matched_text: m.as_str().to_string(),
                });
            }
        }

        matches.sort_by_key(|m| m.start_index);
        matches
    }

    /// Split `text` into non-overlapping segments covering the entire input
    /// exactly once. When two keyword spans would overlap, the longer keyword
    /// word wins; this is the single tie-break rule.
    pub fn segment_text(text: &str, keywords: &[KeywordDefinition]) -> Vec<TextSegment> {
        let mut ranked: Vec<&KeywordDefinition> = valid_keywords(keywords).collect();
        ranked.sort_by(|a, b| b.word.len().cmp(&a.word.len()));

        let mut accepted: Vec<KeywordMatch> = Vec::new();
        for keyword in ranked {
            let regex = match word_regex(&keyword.word) {
                Some(r) => r,
                None => continue,
            };
            for m in regex.find_iter(text) {
                let overlaps = accepted
                    .iter()
                    .any(|a| m.start() < a.end_index && m.end() > a.start_index);
                if !overlaps {
                    accepted.push(KeywordMatch {
                        keyword: keyword.clone(),
                        start_index: m.start(),
                        end_index: m.end(),
                        matched_text: m.as_str().to_string(),
                    });
                }
            }
        }
        accepted.sort_by_key(|m| m.start_index);

        let mut segments = Vec::new();
        let mut cursor = 0;
        for m in &accepted {
            if m.start_index > cursor {
                segments.push(TextSegment::plain(&text[cursor..m.start_index]));
            }
            segments.push(TextSegment::matched(&m.matched_text, &m.keyword));
            cursor = m.end_index;
        }
        if cursor < text.len() {
            segments.push(TextSegment::plain(&text[cursor..]));
        }

        segments
    }

    /// Keywords whose `[start_time, end_time]` intersects the window
    pub fn filter_by_time_window(
        keywords: &[KeywordDefinition],
        start: f64,
        end: f64,
    ) -> Vec<KeywordDefinition> {
        keywords
            .iter()
            .filter(|k| k.intersects(start, end))
            .cloned()
            .collect()
    }

    /// Enforce the keyword definition invariants: non-empty word and
    /// translation, `0 <= start_time < end_time`.
    pub fn validate_keyword(keyword: &KeywordDefinition) -> Result<()> {
        if keyword.word.trim().is_empty() {
            return Err(EngineError::InvalidKeyword(format!(
                "keyword {} has an empty word",
                keyword.id
            )));
        }
        if keyword.translation.trim().is_empty() {
            return Err(EngineError::InvalidKeyword(format!(
                "keyword {} has an empty translation",
                keyword.id
            )));
        }
        if keyword.start_time < 0.0 || keyword.start_time >= keyword.end_time {
            return Err(EngineError::InvalidKeyword(format!(
                "keyword {} has an invalid time window {}..{}",
                keyword.id, keyword.start_time, keyword.end_time
            )));
        }
        Ok(())
    }
}

/// Iterate only the keywords that pass validation
fn valid_keywords(keywords: &[KeywordDefinition]) -> impl Iterator<Item = &KeywordDefinition> {
    keywords.iter().filter(|k| {
        match KeywordMatcher::validate_keyword(k) {
            Ok(()) => true,
            Err(e) => {
                debug!("Excluding keyword from matching: {}", e);
                false
            }
        }
    })
}

/// Case-insensitive whole-word pattern for a keyword. Boundary assertions
/// only apply where the word edge is a word character, so vocabulary ending
/// in punctuation still matches.
fn word_regex(word: &str) -> Option<regex::Regex> {
    let prefix = if word.chars().next().is_some_and(is_word_char) {
        r"\b"
    } else {
        ""
    };
    let suffix = if word.chars().last().is_some_and(is_word_char) {
        r"\b"
    } else {
        ""
    };

    RegexBuilder::new(&format!("{}{}{}", prefix, regex::escape(word), suffix))
        .case_insensitive(true)
        .build()
        .ok()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
