use crate::chartext::CharIndex;
use crate::ids::generate_chunk_id;
use crate::models::{Chunk, Document, Page, SourceRef};
use strata_core::StrataError;

/// Fixed-size word-count chunker with overlap.
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Chunk a document's normalized text into offset-exact slices.
    ///
    /// `offset_start`/`offset_end` are *character* positions in
    /// `normalized_text`, per the data model, so the walk below is done over
    /// a [`CharIndex`] rather than raw byte slicing. Each chunk covers
    /// `[pos, end)` where `end` is roughly `pos` plus `chunk_size` words; the
    /// next `pos` steps back from `end` by `chunk_overlap` words. Terminates
    /// once the cursor can no longer advance.
    pub fn chunk_document(&self, document: &Document) -> Result<Vec<Chunk>, StrataError> {
        let text = document.normalized_text.as_str();
        let mut chunks = Vec::new();

        if text.split_whitespace().next().is_none() {
            return Ok(chunks);
        }

        let index = CharIndex::new(text);
        let mut pos = 0usize;
        let mut chunk_index: u32 = 0;

        while pos < index.len() {
            let end = find_chunk_end(&index, pos, self.chunk_size);
            if end <= pos {
                break;
            }

            let chunk_text = index.slice(pos, end);
            if chunk_text.is_empty() {
                break;
            }

            let (page_start, page_end) = derive_page_range(&document.pages, pos, end);

            let chunk_id = generate_chunk_id(&document.doc_uid, pos, end, chunk_text);

            let source_ref = SourceRef {
                source_path: document.source_path.clone(),
                offset_start: pos,
                offset_end: end,
                page_start,
                page_end,
            };

            chunks.push(Chunk {
                chunk_id,
                doc_uid: document.doc_uid.clone(),
                doc_id: document.doc_id.clone(),
                text: chunk_text.to_string(),
                offset_start: pos,
                offset_end: end,
                chunk_index,
                source_ref,
                page_start,
                page_end,
            });

            chunk_index += 1;

            if end >= index.len() {
                break;
            }

            let next_pos = find_chunk_start(&index, end, self.chunk_overlap);
            if next_pos <= pos {
                // overlap didn't move the cursor backwards enough to make
                // progress against the current chunk start; advance to `end`
                // instead of looping forever.
                if end <= pos {
                    break;
                }
                pos = end;
            } else {
                pos = next_pos;
            }
        }

        Ok(chunks)
    }
}

/// Advance from `start_pos` through `target_words` whitespace-delimited
/// words, returning the resulting char offset (or `index.len()` if the
/// remaining text has fewer than `target_words` words).
fn find_chunk_end(index: &CharIndex, start_pos: usize, target_words: usize) -> usize {
    let remaining_word_count = index
        .slice(start_pos, index.len())
        .split_whitespace()
        .count();
    if remaining_word_count <= target_words {
        return index.len();
    }

    let len = index.len();
    let mut pos = start_pos;
    let mut word_count = 0;
    while pos < len && word_count < target_words {
        while pos < len && index.char_at(pos).is_whitespace() {
            pos += 1;
        }
        while pos < len && !index.char_at(pos).is_whitespace() {
            pos += 1;
        }
        word_count += 1;
    }
    pos
}

/// Step backwards from `end_pos` over `target_words` words, returning the
/// resulting char offset (or `0` if fewer than `target_words` words precede
/// `end_pos`).
fn find_chunk_start(index: &CharIndex, end_pos: usize, target_words: usize) -> usize {
    let preceding_word_count = index.slice(0, end_pos).split_whitespace().count();
    if preceding_word_count <= target_words {
        return 0;
    }

    let mut pos = end_pos;
    let mut word_count = 0;
    while pos > 0 && word_count < target_words {
        while pos > 0 && index.char_at(pos - 1).is_whitespace() {
            pos -= 1;
        }
        while pos > 0 && !index.char_at(pos - 1).is_whitespace() {
            pos -= 1;
        }
        word_count += 1;
    }
    pos
}

/// Minimum/maximum page number whose span overlaps `[offset_start, offset_end)`.
fn derive_page_range(
    pages: &[Page],
    offset_start: usize,
    offset_end: usize,
) -> (Option<i32>, Option<i32>) {
    let mut page_start = None;
    let mut page_end = None;

    for page in pages {
        let overlaps = !(page.offset_end <= offset_start || page.offset_start >= offset_end);
        if overlaps {
            if page_start.is_none() {
                page_start = Some(page.page_number as i32);
            }
            page_end = Some(page.page_number as i32);
        }
    }

    (page_start, page_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::generate_doc_uid;

    fn doc_with_text(text: &str) -> Document {
        let doc_uid = generate_doc_uid("a.txt");
        Document {
            doc_uid: doc_uid.clone(),
            doc_id: "deadbeefdeadbeef".to_string(),
            source_path: "a.txt".to_string(),
            raw_text: text.to_string(),
            normalized_text: text.to_string(),
            title: None,
            pages: Vec::new(),
            extracted_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn slice_equals_normalized_text_window() {
        let text = "one two three four five six seven eight nine ten";
        let doc = doc_with_text(text);
        let chunker = FixedSizeChunker::new(4, 1);
        let chunks = chunker.chunk_document(&doc).unwrap();

        for chunk in &chunks {
            assert_eq!(
                chunk.text,
                doc.normalized_text[chunk.offset_start..chunk.offset_end]
            );
        }
    }

    #[test]
    fn cursor_makes_strictly_positive_progress() {
        let text = "a b c d e f g h i j k l m n o p q r s t".to_string();
        let doc = doc_with_text(&text);
        let chunker = FixedSizeChunker::new(5, 2);
        let chunks = chunker.chunk_document(&doc).unwrap();

        let mut last_start = None;
        for chunk in &chunks {
            if let Some(prev) = last_start {
                assert!(chunk.offset_start > prev);
            }
            last_start = Some(chunk.offset_start);
        }
        assert!(chunks.len() > 1);
    }

    #[test]
    fn chunk_id_stable_for_identical_offsets_and_text() {
        let text = "one two three four five";
        let doc = doc_with_text(text);
        let chunker = FixedSizeChunker::new(10, 0);
        let chunks1 = chunker.chunk_document(&doc).unwrap();
        let chunks2 = chunker.chunk_document(&doc).unwrap();
        assert_eq!(chunks1[0].chunk_id, chunks2[0].chunk_id);
    }

    #[test]
    fn empty_text_produces_no_chunks() {
        let doc = doc_with_text("   \n  ");
        let chunker = FixedSizeChunker::new(10, 2);
        let chunks = chunker.chunk_document(&doc).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn short_text_yields_single_chunk() {
        let text = "just a few words";
        let doc = doc_with_text(text);
        let chunker = FixedSizeChunker::new(50, 5);
        let chunks = chunker.chunk_document(&doc).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
    }

    #[test]
    fn multibyte_text_is_chunked_by_char_position_not_byte_position() {
        let text = "café naïve façade résumé crème brûlée déjà vu";
        let doc = doc_with_text(text);
        let chunker = FixedSizeChunker::new(3, 1);
        let chunks = chunker.chunk_document(&doc).unwrap();

        assert!(!chunks.is_empty());
        let char_len = text.chars().count();
        assert!(text.len() > char_len, "fixture must contain multi-byte chars");

        for chunk in &chunks {
            assert!(chunk.offset_end <= char_len);
            let expected: String = text
                .chars()
                .skip(chunk.offset_start)
                .take(chunk.offset_end - chunk.offset_start)
                .collect();
            assert_eq!(chunk.text, expected);
        }
    }

    #[test]
    fn page_range_reflects_overlapping_pages() {
        let text = "alpha beta gamma delta epsilon zeta";
        let mut doc = doc_with_text(text);
        doc.pages = vec![
            Page {
                page_number: 1,
                offset_start: 0,
                offset_end: 11,
            },
            Page {
                page_number: 2,
                offset_start: 11,
                offset_end: text.len(),
            },
        ];
        let chunker = FixedSizeChunker::new(50, 0);
        let chunks = chunker.chunk_document(&doc).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].page_start, Some(1));
        assert_eq!(chunks[0].page_end, Some(2));
    }
}
