use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::chartext::char_len;
use crate::ids::{generate_doc_id, generate_doc_uid, normalize_path, sha256_hex_of};
use crate::models::{Document, Page};
use crate::normalizer::normalize;
use strata_core::StrataError;

/// Parses a source file into a [`Document`].
///
/// Implementations set `normalized_text` via [`crate::normalizer::normalize`]
/// and populate `pages` for paginated formats with intervals that match the
/// offsets of their content within `normalized_text`.
pub trait Parser {
    fn parse(&self, file_path: &Path, corpus_root: &Path) -> Result<Document, StrataError>;
}

fn relative_path(file_path: &Path, corpus_root: &Path) -> String {
    let relative = file_path
        .strip_prefix(corpus_root)
        .unwrap_or(file_path)
        .to_string_lossy()
        .into_owned();
    normalize_path(&relative)
}

fn build_document(
    source_path: String,
    raw_text: String,
    normalized_text: String,
    title: Option<String>,
    pages: Vec<Page>,
) -> Document {
    let doc_uid = generate_doc_uid(&source_path);
    let doc_id = generate_doc_id(&doc_uid, &sha256_hex_of(&normalized_text));
    Document {
        doc_uid,
        doc_id,
        source_path,
        raw_text,
        normalized_text,
        title,
        pages,
        extracted_at: Utc::now(),
    }
}

/// Reads a `.txt`/`.text` file as UTF-8 (lossily replacing invalid
/// sequences). No pages, no title.
pub struct TextParser;

impl Parser for TextParser {
    fn parse(&self, file_path: &Path, corpus_root: &Path) -> Result<Document, StrataError> {
        let bytes = std::fs::read(file_path).map_err(|e| {
            StrataError::parse(file_path.display().to_string(), e.to_string())
        })?;
        let raw_text = String::from_utf8_lossy(&bytes).into_owned();
        let normalized_text = normalize(&raw_text);
        let source_path = relative_path(file_path, corpus_root);

        Ok(build_document(source_path, raw_text, normalized_text, None, Vec::new()))
    }
}

/// A single page's raw text, prior to normalization and offset recomputation.
pub struct RawPage {
    pub page_number: u32,
    pub raw_text: String,
}

/// Seam for paginated formats (PDF) whose byte decoder is out of scope here.
///
/// A concrete adapter only needs to produce one [`RawPage`] per page; this
/// trait supplies the offset-recomputation recipe so Page intervals always
/// line up with the final `normalized_text`, regardless of what NFKC and
/// whitespace collapsing did to each page's byte length.
pub trait PagedParser {
    fn extract_pages(&self, file_path: &Path) -> Result<Vec<RawPage>, StrataError>;

    fn parse_paginated(
        &self,
        file_path: &Path,
        corpus_root: &Path,
    ) -> Result<Document, StrataError> {
        let raw_pages = self.extract_pages(file_path)?;
        let raw_text = raw_pages
            .iter()
            .map(|p| p.raw_text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let (normalized_text, pages) = recompute_page_offsets(&raw_pages);
        let source_path = relative_path(file_path, corpus_root);

        Ok(build_document(source_path, raw_text, normalized_text, None, pages))
    }
}

/// Concatenate each page's *normalized* text with a single `\n` separator,
/// recording the `[start, end)` span (in characters) each page occupies in
/// the growing concatenation. Pre-normalization offsets are not reusable
/// here: NFKC and whitespace collapsing can change a page's length, so
/// offsets must be derived after normalizing each page individually. Offsets
/// are character positions, not byte positions, per the data model.
fn recompute_page_offsets(raw_pages: &[RawPage]) -> (String, Vec<Page>) {
    let mut normalized_text = String::new();
    let mut char_pos = 0usize;
    let mut pages = Vec::with_capacity(raw_pages.len());

    for (i, raw_page) in raw_pages.iter().enumerate() {
        let normalized_page_text = normalize(&raw_page.raw_text);
        if i > 0 {
            normalized_text.push('\n');
            char_pos += 1;
        }
        let start = char_pos;
        let page_char_len = char_len(&normalized_page_text);
        normalized_text.push_str(&normalized_page_text);
        char_pos += page_char_len;
        let end = char_pos;

        pages.push(Page {
            page_number: raw_page.page_number,
            offset_start: start,
            offset_end: end,
        });
    }

    (normalized_text, pages)
}

/// Walks a corpus directory and selects files this build knows how to parse.
pub struct CorpusWalker {
    root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Text(PathBuf),
    /// Recognized but unsupported without a concrete decoder.
    UnsupportedPaged(PathBuf),
}

impl CorpusWalker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Enumerate files in deterministic (lexicographic, by normalized
    /// relative path) order, routed to the parser that should handle them.
    pub fn walk(&self) -> Result<Vec<RouteDecision>, StrataError> {
        let mut entries: Vec<(String, PathBuf)> = Vec::new();

        for entry in walkdir::WalkDir::new(&self.root) {
            let entry = entry.map_err(|e| StrataError::parse(self.root.display().to_string(), e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path().to_path_buf();
            let relative = relative_path(&path, &self.root);
            entries.push((relative, path));
        }

        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut decisions = Vec::with_capacity(entries.len());
        for (_, path) in entries {
            let extension = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase());

            match extension.as_deref() {
                Some("txt") | Some("text") => decisions.push(RouteDecision::Text(path)),
                Some("pdf") => decisions.push(RouteDecision::UnsupportedPaged(path)),
                _ => {}
            }
        }

        Ok(decisions)
    }
}
