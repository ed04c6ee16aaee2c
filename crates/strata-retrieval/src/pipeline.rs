use std::collections::HashSet;

use crate::bm25::Bm25Index;
use crate::models::{RetrievalResult, SourceRef};
use crate::store::ChunkStore;
use strata_core::{Score, StrataError};

const SNIPPET_MAX_LENGTH: usize = 200;

/// Joins the BM25 index to the chunk store to answer retrieval queries.
pub struct RetrievalPipeline<'a> {
    index: &'a Bm25Index,
    store: &'a ChunkStore,
}

impl<'a> RetrievalPipeline<'a> {
    pub fn new(index: &'a Bm25Index, store: &'a ChunkStore) -> Self {
        Self { index, store }
    }

    /// Pure index lookup: ranked `(chunk_id, score)` pairs, no payload reads.
    pub fn retrieve_ids(&self, query: &str, top_k: usize) -> Vec<(String, f32)> {
        self.index.search(query, top_k)
    }

    /// Ranked results with matched terms, a snippet, and source provenance.
    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalResult>, StrataError> {
        let hits = self.retrieve_ids(query, top_k);
        let query_tokens: HashSet<String> =
            self.index.tokenizer().tokenize(query).into_iter().collect();

        let mut results = Vec::with_capacity(hits.len());
        for (chunk_id, score) in hits {
            let Some(chunk) = self.store.read_chunk(&chunk_id)? else {
                continue;
            };

            let chunk_tokens: HashSet<String> =
                self.index.tokenizer().tokenize(&chunk.text).into_iter().collect();
            let mut matched_terms: Vec<String> =
                query_tokens.intersection(&chunk_tokens).cloned().collect();
            matched_terms.sort();

            let snippet = generate_snippet(&chunk.text, &matched_terms, SNIPPET_MAX_LENGTH);

            results.push(RetrievalResult {
                chunk_id,
                score: Score::new(score),
                matched_terms,
                snippet,
                source_ref: chunk.source_ref,
            });
        }

        Ok(results)
    }

    /// Materialize chunks by id, silently skipping unknown or tombstoned ids.
    pub fn fetch_chunks(
        &self,
        chunk_ids: &[String],
    ) -> Result<Vec<crate::models::Chunk>, StrataError> {
        let mut chunks = Vec::new();
        for chunk_id in chunk_ids {
            if let Some(chunk) = self.store.read_chunk(chunk_id)? {
                chunks.push(chunk);
            }
        }
        Ok(chunks)
    }
}

/// Snippet of up to `max_length` characters centred on the earliest
/// case-insensitive occurrence of any matched term. Falls back to the start
/// of the text when there's no match. Ellipses mark truncation on either end.
///
/// Matching and truncation both work over `Vec<char>`, not `&str` byte
/// slices: `str::to_lowercase` can change a string's character count (e.g.
/// Turkish dotted İ), which would break any attempt to translate a
/// byte-based `.find()` result back into a character position. Folding case
/// one char at a time keeps a 1:1 index correspondence between
/// `text_chars` and `lower_chars`.
fn generate_snippet(text: &str, matched_terms: &[String], max_length: usize) -> String {
    if matched_terms.is_empty() || text.is_empty() {
        return truncate_chars(text, max_length);
    }

    let text_chars: Vec<char> = text.chars().collect();
    let lower_chars: Vec<char> = text_chars
        .iter()
        .map(|c| c.to_lowercase().next().unwrap_or(*c))
        .collect();

    let mut first_pos = None;
    for term in matched_terms {
        let term_lower: Vec<char> = term.to_lowercase().chars().collect();
        if let Some(pos) = find_char_subslice(&lower_chars, &term_lower) {
            first_pos = Some(match first_pos {
                Some(existing) if existing <= pos => existing,
                _ => pos,
            });
        }
    }

    let Some(first_pos) = first_pos else {
        return truncate_chars(text, max_length);
    };

    let half = max_length / 2;
    let start = first_pos.saturating_sub(half);
    let end = (first_pos + half).min(text_chars.len());

    let mut snippet: String = text_chars[start..end].iter().collect();
    if start > 0 {
        snippet = format!("...{snippet}");
    }
    if end < text_chars.len() {
        snippet.push_str("...");
    }
    snippet
}

/// First char position at which `needle` occurs in `haystack`, or `None` if
/// `needle` is empty or longer than `haystack`.
fn find_char_subslice(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).find(|&i| haystack[i..i + needle.len()] == *needle)
}

fn truncate_chars(text: &str, max_length: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_length {
        return text.to_string();
    }
    chars[..max_length].iter().collect()
}

/// Shift-to-zero display normalization: the minimum score becomes `0.0` and
/// every other score is shifted by the same delta. Pure, side-effect-free,
/// and separate from the raw-score contract of [`RetrievalPipeline::retrieve`];
/// ranking order is preserved exactly.
pub fn normalize_scores_for_display(results: &[RetrievalResult]) -> Vec<f32> {
    if results.is_empty() {
        return Vec::new();
    }

    let min_score = results
        .iter()
        .map(|r| r.score.value())
        .fold(f32::INFINITY, f32::min);
    let shift = if min_score < 0.0 { -min_score } else { 0.0 };

    results.iter().map(|r| r.score.value() + shift).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with_score(score: f32) -> RetrievalResult {
        RetrievalResult {
            chunk_id: "id".to_string(),
            score: Score::new(score),
            matched_terms: vec!["term".to_string()],
            snippet: "snippet".to_string(),
            source_ref: SourceRef {
                source_path: "test.txt".to_string(),
                offset_start: 0,
                offset_end: 10,
                page_start: None,
                page_end: None,
            },
        }
    }

    #[test]
    fn normalize_shifts_negative_scores_to_nonnegative() {
        let results = vec![
            result_with_score(-5.0),
            result_with_score(-3.0),
            result_with_score(-1.0),
        ];
        let display = normalize_scores_for_display(&results);
        assert!(display.iter().all(|&s| s >= 0.0));
        assert_eq!(display, vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn normalize_preserves_order() {
        let results = vec![
            result_with_score(-2.0),
            result_with_score(0.0),
            result_with_score(5.0),
        ];
        let display = normalize_scores_for_display(&results);
        assert!(display[0] < display[1] && display[1] < display[2]);
        assert_eq!(display, vec![0.0, 2.0, 7.0]);
    }

    #[test]
    fn normalize_leaves_all_positive_scores_unchanged() {
        let results = vec![result_with_score(1.0), result_with_score(2.0), result_with_score(3.0)];
        let display = normalize_scores_for_display(&results);
        assert_eq!(display, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn normalize_empty_input_yields_empty_output() {
        assert!(normalize_scores_for_display(&[]).is_empty());
    }

    #[test]
    fn snippet_centers_on_first_matched_term() {
        let text = "aaaa needle bbbb";
        let snippet = generate_snippet(text, &["needle".to_string()], 200);
        assert!(snippet.contains("needle"));
        assert!(!snippet.starts_with("..."));
    }

    #[test]
    fn snippet_marks_truncation_with_ellipses() {
        let text = format!("{} needle {}", "a".repeat(300), "b".repeat(300));
        let snippet = generate_snippet(&text, &["needle".to_string()], 100);
        assert!(snippet.starts_with("..."));
        assert!(snippet.ends_with("..."));
    }

    #[test]
    fn snippet_falls_back_to_text_start_without_match() {
        let text = "no relevant terms here";
        let snippet = generate_snippet(text, &[], 10);
        assert_eq!(snippet, "no relevan");
    }
}
