
use std::collections::HashSet;

use super::tokenize;

/// Reduce `text` to the sentences that share the most words with `query`.
///
/// The text is split on `.` and newlines. Each piece is scored by the number
/// of distinct query words it contains, and the best `max_lines` pieces with
/// a non-zero score are joined with newlines. Equal scores go to the line
/// that sorts last as text. When no
/// piece shares a word with the query the first `fallback_chars` characters
/// of the trimmed text are returned instead.
#[inline]
pub fn extract_relevant_lines(
    text: &str,
    query: &str,
    max_lines: usize,
    fallback_chars: usize,
) -> String {
    let query_words: HashSet<String> = tokenize(query).into_iter().collect();

    let mut scored: Vec<(usize, &str)> = text
        .split(['.', '\n'])
        .filter_map(|line| {
            let words: HashSet<String> = tokenize(line).into_iter().collect();
            let score = words.intersection(&query_words).count();
            (score > 0).then_some((score, line.trim()))
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(a.1)));

    let lines: Vec<&str> = scored
        .into_iter()
        .take(max_lines)
        .map(|(_, line)| line)
        .collect();

    if lines.is_empty() {
        text.trim().chars().take(fallback_chars).collect()
    } else {
        lines.join("\n")
    }
}
