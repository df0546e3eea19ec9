
use tracing::debug;

use super::tokenize;
use crate::corpus::{Chunk, Corpus};
use crate::embeddings::word_count;

/// A chunk matched by token overlap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeywordMatch<'a> {
    pub chunk: &'a Chunk,
    pub index: usize,
    /// Query tokens found in the chunk text, duplicates counted
    pub overlap: usize,
    /// `overlap` plus a small bonus per chunk word
    pub score: f32,
}

/// Score chunks by how many query tokens their text contains.
///
/// Chunks containing no query token are excluded. The remaining chunks are
/// ordered by score, highest first with ties in corpus order, and the first
/// `k` returned.
#[inline]
pub fn keyword_fallback<'a>(
    query: &str,
    corpus: &'a Corpus,
    k: usize,
    length_bonus: f32,
) -> Vec<KeywordMatch<'a>> {
    let tokens = tokenize(query);
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut matches: Vec<KeywordMatch<'a>> = corpus
        .chunks()
        .iter()
        .enumerate()
        .filter_map(|(index, chunk)| {
            let text = chunk.text.to_lowercase();
            let overlap = tokens
                .iter()
                .filter(|token| text.contains(token.as_str()))
                .count();
            (overlap > 0).then(|| KeywordMatch {
                chunk,
                index,
                overlap,
                score: overlap as f32 + length_bonus * word_count(&chunk.text) as f32,
            })
        })
        .collect();

    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    matches.truncate(k);

    debug!(
        "Keyword fallback over {} tokens kept {} matches",
        tokens.len(),
        matches.len()
    );
    matches
}
