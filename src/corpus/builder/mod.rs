
use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use scraper::Html;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use super::{Chunk, Corpus, Source};
use crate::embeddings::{ChunkingConfig, Embedder, chunk_text};

/// Number of windows embedded between progress updates
const EMBED_BATCH_SIZE: usize = 32;

/// Body of a raw document before windowing
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentBody {
    Html(String),
    Text(String),
}

/// A document fed to the corpus builder
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub url: String,
    pub body: DocumentBody,
    pub source: Source,
    /// Whether `url` already points at this document; otherwise each window
    /// gets a `#chunk-N` anchor
    pub anchored: bool,
}

/// A window of text with its origin, not yet embedded
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    pub text: String,
    pub url: String,
    pub source: Source,
}

/// Forum post as written by the scraper
#[derive(Debug, Deserialize)]
struct ForumPost {
    url: String,
    #[serde(default)]
    content: String,
}

impl RawDocument {
    /// Plain text of the document
    #[inline]
    pub fn text(&self) -> String {
        match &self.body {
            DocumentBody::Html(html) => html_to_text(html),
            DocumentBody::Text(text) => text.clone(),
        }
    }
}

/// Load scraped forum posts (`[{url, title, content, ...}]`, HTML content)
#[inline]
pub fn load_posts(path: &Path) -> Result<Vec<RawDocument>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read posts file: {}", path.display()))?;
    let posts: Vec<ForumPost> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse posts file: {}", path.display()))?;

    debug!("Loaded {} posts from {}", posts.len(), path.display());

    Ok(posts
        .into_iter()
        .map(|post| RawDocument {
            url: post.url,
            body: DocumentBody::Html(post.content),
            source: Source::Discourse,
            anchored: true,
        })
        .collect())
}

/// Load course notes text (extracted from the notes PDF) published under `base_url`
#[inline]
pub fn load_notes(path: &Path, base_url: &str) -> Result<RawDocument> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read notes file: {}", path.display()))?;

    Ok(RawDocument {
        url: base_url.to_string(),
        body: DocumentBody::Text(text),
        source: Source::Course,
        anchored: false,
    })
}

/// Extract visible text from an HTML fragment
#[inline]
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);

    fragment
        .tree
        .nodes()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node
                .parent()
                .and_then(|parent| parent.value().as_element().map(|el| el.name()))
                .is_some_and(|name| matches!(name, "script" | "style" | "template"));
            let text = text.trim();
            (!hidden && !text.is_empty()).then_some(text)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Window every document into chunk records, in document then window order.
/// Documents without extractable text are skipped.
#[inline]
pub fn chunk_documents(
    documents: &[RawDocument],
    config: &ChunkingConfig,
) -> Result<Vec<ChunkRecord>> {
    let mut records = Vec::new();

    for document in documents {
        let text = document.text();
        if text.trim().is_empty() {
            debug!("Skipping {}: no extractable text", document.url);
            continue;
        }

        let windows = chunk_text(&text, config)
            .with_context(|| format!("Failed to chunk {}", document.url))?;

        records.extend(windows.into_iter().map(|window| {
            let url = if document.anchored {
                document.url.clone()
            } else {
                format!("{}#chunk-{}", document.url, window.window_index + 1)
            };
            ChunkRecord {
                text: window.text,
                url,
                source: document.source,
            }
        }));
    }

    info!(
        "Chunked {} documents into {} records",
        documents.len(),
        records.len()
    );
    Ok(records)
}

/// Embed chunk records into a corpus with the given embedder
#[inline]
pub fn build_corpus<E: Embedder>(records: &[ChunkRecord], embedder: &E) -> Result<Corpus> {
    info!(
        "Embedding {} records with model {}",
        records.len(),
        embedder.model_name()
    );

    let bar = if console::user_attended_stderr() {
        ProgressBar::new(records.len() as u64).with_style(
            ProgressStyle::with_template("{bar:40} [{pos}/{len}] Embedding {msg}")
                .expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    };
    bar.set_message(embedder.model_name().to_string());

    let mut chunks = Vec::with_capacity(records.len());
    for batch in records.chunks(EMBED_BATCH_SIZE) {
        let texts: Vec<String> = batch.iter().map(|record| record.text.clone()).collect();
        let embeddings = embedder
            .embed_batch(&texts)
            .with_context(|| format!("Failed to embed batch of {} records", batch.len()))?;

        if embeddings.len() != batch.len() {
            bail!(
                "Embedder returned {} embeddings for {} records",
                embeddings.len(),
                batch.len()
            );
        }

        chunks.extend(
            batch
                .iter()
                .zip(embeddings)
                .map(|(record, embedding)| Chunk {
                    text: record.text.clone(),
                    embedding,
                    url: record.url.clone(),
                    source: record.source,
                }),
        );
        bar.inc(batch.len() as u64);
    }
    bar.finish_and_clear();

    Corpus::new(chunks).context("Embedded corpus is inconsistent")
}
