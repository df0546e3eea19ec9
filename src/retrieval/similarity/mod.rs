
use anyhow::{Result, bail};
use tracing::debug;

use crate::corpus::{Chunk, Corpus};

/// A chunk scored against one query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match<'a> {
    pub chunk: &'a Chunk,
    /// Position of the chunk in the corpus
    pub index: usize,
    pub score: f32,
}

/// Cosine similarity of two equal-length vectors; 0.0 when either has zero norm
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Score every chunk against `query` and return the `k` best, highest first.
/// Equal scores keep corpus order.
#[inline]
pub fn rank<'a>(query: &[f32], corpus: &'a Corpus, k: usize) -> Result<Vec<Match<'a>>> {
    if let Some(dimension) = corpus.dimension().filter(|d| *d != query.len()) {
        bail!(
            "Query embedding has {} dimensions but the corpus has {}",
            query.len(),
            dimension
        );
    }

    let mut matches: Vec<Match<'a>> = corpus
        .chunks()
        .iter()
        .enumerate()
        .map(|(index, chunk)| Match {
            chunk,
            index,
            score: cosine_similarity(query, &chunk.embedding),
        })
        .collect();

    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    matches.truncate(k);

    debug!(
        "Ranked {} chunks, best score {:?}",
        corpus.len(),
        matches.first().map(|m| m.score)
    );
    Ok(matches)
}
