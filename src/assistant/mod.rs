//! Question answering over a loaded corpus
//!
//! [`Assistant`] owns the corpus, the embedder and an optional screenshot
//! recognizer, and turns each question into an [`Answer`]. Queries only
//! borrow the assistant and never fail: internal errors are logged and
//! reported in the answer text.

pub mod ocr;

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::corpus::{Chunk, Corpus, Source};
use crate::embeddings::Embedder;
use crate::retrieval::{RetrievalConfig, extract_relevant_lines, keyword_fallback, rank};
use ocr::TextRecognizer;

pub const NOT_LOADED_MESSAGE: &str = "Error: Embedding database not loaded.";
pub const EMPTY_QUESTION_MESSAGE: &str = "Please enter a question or upload an image.";
pub const NO_MATCH_MESSAGE: &str = "No relevant content found.";

/// Which path produced an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerKind {
    NotLoaded,
    EmptyQuestion,
    Semantic,
    Fallback,
    NoMatch,
    Error,
}

/// A source reference shown under an answer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub url: String,
    /// Single-line snippet of the chunk text
    pub text: String,
    pub source: Source,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub answer: String,
    pub links: Vec<Link>,
    #[serde(skip)]
    pub kind: AnswerKind,
}

impl Answer {
    fn message(kind: AnswerKind, answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            links: Vec::new(),
            kind,
        }
    }

    /// Links as a numbered markdown list, one per line
    #[inline]
    pub fn render_links(&self) -> String {
        self.links
            .iter()
            .enumerate()
            .map(|(i, link)| {
                format!(
                    "{}. [{}...]({}) - {} ({:.2})",
                    i + 1,
                    link.text,
                    link.url,
                    link.source,
                    link.score
                )
            })
            .join("\n")
    }
}

pub struct Assistant<E: Embedder> {
    corpus: Corpus,
    embedder: E,
    recognizer: Option<Box<dyn TextRecognizer>>,
    settings: RetrievalConfig,
}

impl<E: Embedder> Assistant<E> {
    #[inline]
    pub fn new(corpus: Corpus, embedder: E, settings: RetrievalConfig) -> Self {
        Self {
            corpus,
            embedder,
            recognizer: None,
            settings,
        }
    }

    /// Read questions from images with this recognizer
    #[inline]
    #[must_use]
    pub fn with_recognizer(mut self, recognizer: Box<dyn TextRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    #[inline]
    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    #[inline]
    pub fn settings(&self) -> &RetrievalConfig {
        &self.settings
    }

    /// Answer a typed question, or the text recognized in `image` when there
    /// is one
    #[inline]
    pub fn answer(&self, question: &str, image: Option<&[u8]>) -> Answer {
        if self.corpus.is_empty() {
            return Answer::message(AnswerKind::NotLoaded, NOT_LOADED_MESSAGE);
        }

        let question = self.resolve_question(question, image);
        let question = question.trim();
        if question.is_empty() {
            return Answer::message(AnswerKind::EmptyQuestion, EMPTY_QUESTION_MESSAGE);
        }

        match self.search(question) {
            Ok(answer) => answer,
            Err(e) => {
                error!("Failed to answer question: {:#}", e);
                Answer::message(AnswerKind::Error, format!("An error occurred: {:#}", e))
            }
        }
    }

    fn resolve_question(&self, question: &str, image: Option<&[u8]>) -> String {
        let (Some(image), Some(recognizer)) = (image, &self.recognizer) else {
            return question.to_string();
        };

        match recognizer.recognize(image) {
            Ok(text) if !text.trim().is_empty() => {
                debug!("Recognized question from image: {}", text);
                text
            }
            Ok(_) => {
                debug!("No text recognized in image, using typed question");
                question.to_string()
            }
            Err(e) => {
                warn!("Image recognition failed, using typed question: {:#}", e);
                question.to_string()
            }
        }
    }

    fn search(&self, question: &str) -> Result<Answer> {
        let query = self
            .embedder
            .embed(&question.to_lowercase())
            .context("Failed to embed question")?;
        let matches = rank(&query, &self.corpus, self.settings.top_k)?;

        match matches.first() {
            Some(best) if best.score >= self.settings.confidence_threshold => {
                let links = matches
                    .iter()
                    .map(|m| self.link(m.chunk, m.score))
                    .collect();
                Ok(Answer {
                    answer: self.relevant_lines(best.chunk, question),
                    links,
                    kind: AnswerKind::Semantic,
                })
            }
            best => {
                info!(
                    "Best semantic score {:?} below {}, using keyword fallback",
                    best.map(|m| m.score),
                    self.settings.confidence_threshold
                );
                Ok(self.fallback(question))
            }
        }
    }

    fn fallback(&self, question: &str) -> Answer {
        let matches = keyword_fallback(
            question,
            &self.corpus,
            self.settings.fallback_top_k,
            self.settings.length_bonus,
        );

        let Some(best) = matches.first() else {
            return Answer::message(AnswerKind::NoMatch, NO_MATCH_MESSAGE);
        };

        Answer {
            answer: format!(
                "(Fallback from {}):\n\n{}",
                best.chunk.source,
                self.relevant_lines(best.chunk, question)
            ),
            links: vec![self.link(best.chunk, best.score)],
            kind: AnswerKind::Fallback,
        }
    }

    fn relevant_lines(&self, chunk: &Chunk, question: &str) -> String {
        extract_relevant_lines(
            &chunk.text,
            question,
            self.settings.answer_lines,
            self.settings.fallback_chars,
        )
    }

    fn link(&self, chunk: &Chunk, score: f32) -> Link {
        let text: String = chunk
            .text
            .chars()
            .take(self.settings.snippet_chars)
            .map(|c| if c == '\n' { ' ' } else { c })
            .collect();

        Link {
            url: chunk.url.clone(),
            text,
            source: chunk.source,
            score: (score * 100.0).round() / 100.0,
        }
    }
}
