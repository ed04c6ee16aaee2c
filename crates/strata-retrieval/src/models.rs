use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strata_core::Score;

/// A single page's span within a document's normalized text. `offset_start`
/// and `offset_end` are character positions, not byte positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page_number: u32,
    pub offset_start: usize,
    pub offset_end: usize,
}

/// A parsed source document, before and after chunking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub doc_uid: String,
    pub doc_id: String,
    /// Relative path, forward-slashed, `.`/`..` resolved.
    pub source_path: String,
    pub raw_text: String,
    pub normalized_text: String,
    pub title: Option<String>,
    pub pages: Vec<Page>,
    /// When the parser extracted this document, for diagnostics only; no
    /// identifier or offset depends on it.
    pub extracted_at: DateTime<Utc>,
}

/// Citation metadata mirroring a chunk's provenance. `offset_start` and
/// `offset_end` are character positions, not byte positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub source_path: String,
    pub offset_start: usize,
    pub offset_end: usize,
    pub page_start: Option<i32>,
    pub page_end: Option<i32>,
}

/// A contiguous, offset-exact slice of a document's normalized text.
/// `offset_start` and `offset_end` are character positions, not byte
/// positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub doc_uid: String,
    pub doc_id: String,
    pub text: String,
    pub offset_start: usize,
    pub offset_end: usize,
    pub chunk_index: u32,
    pub source_ref: SourceRef,
    pub page_start: Option<i32>,
    pub page_end: Option<i32>,
}

/// A single retrieval hit with relevance explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub chunk_id: String,
    pub score: Score,
    pub matched_terms: Vec<String>,
    pub snippet: String,
    pub source_ref: SourceRef,
}
