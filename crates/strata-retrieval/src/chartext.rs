//! Character-position helpers.
//!
//! Per the data model, every offset stored alongside `normalized_text`
//! (`Page`/`Chunk`/`SourceRef`/the index record's `offset_start`/`offset_end`)
//! is a *character* (Unicode scalar value) position, not a byte position.
//! `&str` indexing in Rust is byte-based, so any code walking
//! `normalized_text` by words or building an offset-bearing slice must go
//! through here rather than slicing `&text[a..b]` directly.

/// Byte-offset boundaries for every character position in a string, so
/// char-position slicing doesn't require rescanning from the start each time.
pub struct CharIndex<'a> {
    text: &'a str,
    /// `boundaries[i]` is the byte offset of char `i`; `boundaries[len()]` is
    /// `text.len()`, a sentinel so `slice`/`char_at` stay branch-free at the
    /// end of the text.
    boundaries: Vec<usize>,
}

impl<'a> CharIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut boundaries: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        boundaries.push(text.len());
        Self { text, boundaries }
    }

    /// Number of characters (Unicode scalar values) in the text.
    pub fn len(&self) -> usize {
        self.boundaries.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The character at char position `i`. Panics if `i >= self.len()`.
    pub fn char_at(&self, i: usize) -> char {
        self.text[self.boundaries[i]..]
            .chars()
            .next()
            .expect("char position within bounds")
    }

    /// Slice the text by char position `[start, end)`.
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.text[self.boundaries[start]..self.boundaries[end]]
    }
}

/// Number of characters in `text`, for callers that don't need full
/// char-position slicing (e.g. accumulating a running char-offset cursor).
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}
