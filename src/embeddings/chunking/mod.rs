
use anyhow::{Context, Result};
use fancy_regex::Regex;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A fixed-size window of document text ready for embedding
#[derive(Debug, Clone, PartialEq)]
pub struct TextWindow {
    /// The window text, whitespace collapsed
    pub text: String,
    /// Position of this window among the kept windows of its document
    pub window_index: usize,
}

/// Configuration for text windowing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum window size in characters
    pub window_chars: usize,
    /// Windows with this many words or fewer are dropped
    pub min_words: usize,
    /// Windows whose start matches this pattern are dropped as boilerplate
    pub noise_pattern: String,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            window_chars: 1000,
            min_words: 5,
            noise_pattern: "(?i)^week_".to_string(),
        }
    }
}

/// Split text into non-overlapping windows of at most `window_chars` characters,
/// dropping short and boilerplate windows. Order is preserved.
#[inline]
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Result<Vec<TextWindow>> {
    let noise = Regex::new(&config.noise_pattern)
        .with_context(|| format!("Invalid noise pattern: {}", config.noise_pattern))?;

    let mut windows = Vec::new();
    let mut dropped = 0;

    for candidate in split_windows(text, config.window_chars) {
        let is_noise = noise
            .is_match(&candidate)
            .context("Noise pattern evaluation failed")?;

        if is_noise || word_count(&candidate) <= config.min_words {
            dropped += 1;
            continue;
        }

        windows.push(TextWindow {
            text: candidate,
            window_index: windows.len(),
        });
    }

    debug!(
        "Windowed {} chars into {} windows ({} dropped)",
        text.len(),
        windows.len(),
        dropped
    );

    Ok(windows)
}

/// Number of whitespace-separated words
#[inline]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Pack words greedily into windows, breaking inside a word only when the
/// word alone is longer than a window.
fn split_windows(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut windows = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            flush_window(&mut windows, &mut current, &mut current_len);
            let pieces: Vec<String> = word
                .chars()
                .chunks(max_chars)
                .into_iter()
                .map(Iterator::collect)
                .collect();
            for piece in pieces {
                let piece_len = piece.chars().count();
                if piece_len == max_chars {
                    windows.push(piece);
                } else {
                    current = piece;
                    current_len = piece_len;
                }
            }
            continue;
        }

        let needed = if current.is_empty() {
            word_len
        } else {
            current_len + 1 + word_len
        };
        if needed > max_chars {
            flush_window(&mut windows, &mut current, &mut current_len);
        }

        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    flush_window(&mut windows, &mut current, &mut current_len);
    windows
}

fn flush_window(windows: &mut Vec<String>, current: &mut String, current_len: &mut usize) {
    if !current.is_empty() {
        windows.push(std::mem::take(current));
    }
    *current_len = 0;
}
