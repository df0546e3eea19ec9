// Embedding generation and the text windowing that feeds it

pub mod chunking;
pub mod ollama;

use anyhow::Result;

pub use chunking::{ChunkingConfig, TextWindow, chunk_text, word_count};
pub use ollama::{DEFAULT_EMBEDDING_DIMENSION, OllamaClient};

/// A sentence-embedding model turning text into fixed-length vectors.
///
/// Vectors are only comparable when they come from the same model, so the
/// corpus builder and the query path must share one implementation and
/// model name.
pub trait Embedder {
    /// Identity of the underlying model
    fn model_name(&self) -> &str;

    /// Embed a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, preserving order
    #[inline]
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}
