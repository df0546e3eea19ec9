//! Ranking and answer extraction over an in-memory corpus
//!
//! Semantic ranking is a linear cosine scan. When its best score is below the
//! confidence threshold the keyword fallback scores chunks by token overlap
//! instead. Either way the answer text is reduced to its most relevant lines.

pub mod keyword;
pub mod lines;
pub mod similarity;


use fancy_regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

pub use keyword::{KeywordMatch, keyword_fallback};
pub use lines::extract_relevant_lines;
pub use similarity::{Match, cosine_similarity, rank};

static WORD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+").expect("word pattern is valid"));

/// Retrieval thresholds and result sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Semantic matches returned per query
    pub top_k: usize,
    /// Best semantic score below which the keyword fallback runs
    pub confidence_threshold: f32,
    /// Per-word score bonus favouring longer chunks in the fallback
    pub length_bonus: f32,
    /// Keyword matches returned by the fallback
    pub fallback_top_k: usize,
    /// Lines kept from the best chunk
    pub answer_lines: usize,
    /// Characters returned when no line matches the question
    pub fallback_chars: usize,
    /// Characters of chunk text shown in a link
    pub snippet_chars: usize,
}

impl Default for RetrievalConfig {
    #[inline]
    fn default() -> Self {
        Self {
            top_k: 3,
            confidence_threshold: 0.45,
            length_bonus: 0.01,
            fallback_top_k: 2,
            answer_lines: 3,
            fallback_chars: 300,
            snippet_chars: 80,
        }
    }
}

/// Lower-cased word tokens of `text`, in order, duplicates kept
#[inline]
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    WORD_PATTERN
        .find_iter(&lowered)
        .filter_map(|found| found.ok())
        .map(|found| found.as_str().to_string())
        .collect()
}
