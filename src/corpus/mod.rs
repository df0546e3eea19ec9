//! Corpus storage
//!
//! A corpus is a JSON array of chunk records, each carrying its text, its
//! embedding, the URL it came from and an optional source tag. It is built
//! once offline and loaded read-only at query time.

pub mod builder;


use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Where a chunk originally came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Course,
    Discourse,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Source {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Course => "course",
            Self::Discourse => "discourse",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Source {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fragment of source text paired with its embedding and origin URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub embedding: Vec<f32>,
    pub url: String,
    #[serde(default)]
    pub source: Source,
}

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Corpus file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Failed to read corpus file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Corpus file {} is not a JSON array of records: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Record {index} uses the legacy `chunk` field; run `course-ta migrate` on the file first")]
    LegacyRecord { index: usize },
    #[error("Record {index} is invalid: {source}")]
    InvalidRecord {
        index: usize,
        source: serde_json::Error,
    },
    #[error("Record {index} has an empty embedding")]
    EmptyEmbedding { index: usize },
    #[error("Record {index} has a {found}-dimensional embedding, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error("Failed to serialize corpus: {0}")]
    Serialize(serde_json::Error),
    #[error("Failed to write corpus file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Ordered, immutable collection of chunks sharing one embedding dimension
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    chunks: Vec<Chunk>,
    dimension: Option<usize>,
}

/// Outcome of a legacy schema migration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub migrated: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

#[derive(Debug, Deserialize)]
struct LegacyRecord {
    chunk: String,
    embedding: Vec<f32>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    meta: Option<LegacyMeta>,
}

#[derive(Debug, Deserialize)]
struct LegacyMeta {
    #[serde(default)]
    url: Option<String>,
}

impl Corpus {
    /// Build a corpus, checking every embedding has the same non-zero dimension
    #[inline]
    pub fn new(chunks: Vec<Chunk>) -> Result<Self, CorpusError> {
        let mut dimension = None;

        for (index, chunk) in chunks.iter().enumerate() {
            let found = chunk.embedding.len();
            if found == 0 {
                return Err(CorpusError::EmptyEmbedding { index });
            }
            match dimension {
                None => dimension = Some(found),
                Some(expected) if expected != found => {
                    return Err(CorpusError::DimensionMismatch {
                        index,
                        expected,
                        found,
                    });
                }
                Some(_) => {}
            }
        }

        Ok(Self { chunks, dimension })
    }

    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a corpus file in the canonical schema
    #[inline]
    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let records = read_records(path)?;
        let mut chunks = Vec::with_capacity(records.len());

        for (index, record) in records.into_iter().enumerate() {
            if is_legacy(&record) {
                return Err(CorpusError::LegacyRecord { index });
            }
            let chunk = serde_json::from_value(record)
                .map_err(|source| CorpusError::InvalidRecord { index, source })?;
            chunks.push(chunk);
        }

        let corpus = Self::new(chunks)?;
        info!(
            "Loaded {} chunks ({:?} dimensions) from {}",
            corpus.len(),
            corpus.dimension(),
            path.display()
        );
        Ok(corpus)
    }

    /// Write the corpus as a JSON array of canonical records
    #[inline]
    pub fn save(&self, path: &Path) -> Result<(), CorpusError> {
        let json = serde_json::to_string_pretty(&self.chunks).map_err(CorpusError::Serialize)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| CorpusError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }

        fs::write(path, json).map_err(|source| CorpusError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Saved {} chunks to {}", self.len(), path.display());
        Ok(())
    }

    #[inline]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Embedding dimension shared by every chunk, `None` for an empty corpus
    #[inline]
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Check the corpus was embedded with a model of the expected dimension
    #[inline]
    pub fn ensure_dimension(&self, expected: usize) -> Result<(), CorpusError> {
        match self.dimension {
            Some(found) if found != expected => Err(CorpusError::DimensionMismatch {
                index: 0,
                expected,
                found,
            }),
            _ => Ok(()),
        }
    }

    /// Tag every chunk without a known source
    #[inline]
    #[must_use]
    pub fn with_default_source(mut self, source: Source) -> Self {
        for chunk in &mut self.chunks {
            if chunk.source == Source::Unknown {
                chunk.source = source;
            }
        }
        self
    }

    /// Concatenate corpora in order; all must share one dimension
    #[inline]
    pub fn merge<I>(parts: I) -> Result<Self, CorpusError>
    where
        I: IntoIterator<Item = Self>,
    {
        let chunks: Vec<Chunk> = parts.into_iter().flat_map(|part| part.chunks).collect();
        Self::new(chunks)
    }

    /// Chunks whose text contains `term`, case-insensitively
    #[inline]
    pub fn find_containing(&self, term: &str) -> Vec<(usize, &Chunk)> {
        let needle = term.to_lowercase();
        self.chunks
            .iter()
            .enumerate()
            .filter(|(_, chunk)| chunk.text.to_lowercase().contains(&needle))
            .collect()
    }
}

/// Convert a corpus file that may contain legacy `chunk` records into the
/// canonical schema. Records carrying neither `text` nor `chunk` are skipped.
#[inline]
pub fn migrate_legacy(
    path: &Path,
    default_url: &str,
) -> Result<(Corpus, MigrationReport), CorpusError> {
    let records = read_records(path)?;
    let mut report = MigrationReport::default();
    let mut chunks = Vec::with_capacity(records.len());

    for (index, record) in records.into_iter().enumerate() {
        if is_legacy(&record) {
            let legacy: LegacyRecord = serde_json::from_value(record)
                .map_err(|source| CorpusError::InvalidRecord { index, source })?;
            let url = legacy
                .meta
                .and_then(|meta| meta.url)
                .or(legacy.url)
                .unwrap_or_else(|| default_url.to_string());
            chunks.push(Chunk {
                text: legacy.chunk,
                embedding: legacy.embedding,
                url,
                source: Source::Discourse,
            });
            report.migrated += 1;
        } else if record.get("text").is_some() {
            let chunk = serde_json::from_value(record)
                .map_err(|source| CorpusError::InvalidRecord { index, source })?;
            chunks.push(chunk);
            report.unchanged += 1;
        } else {
            warn!("Skipping record {} without `text` or `chunk`", index);
            report.skipped += 1;
        }
    }

    debug!("Migration report: {:?}", report);
    Ok((Corpus::new(chunks)?, report))
}

fn is_legacy(record: &Value) -> bool {
    record.get("chunk").is_some() && record.get("text").is_none()
}

fn read_records(path: &Path) -> Result<Vec<Value>, CorpusError> {
    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            CorpusError::NotFound(path.to_path_buf())
        } else {
            CorpusError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    serde_json::from_str(&content).map_err(|source| CorpusError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}
