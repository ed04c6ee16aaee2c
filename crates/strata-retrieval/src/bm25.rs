use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::{debug, info};

use strata_core::StrataError;

const DEFAULT_STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does", "did",
    "will", "would", "should", "could", "may", "might", "must", "can",
];

/// Word-based tokenizer used identically for documents and queries.
///
/// Intentionally term-based (lowercase + `\w+` word-character runs), never
/// sub-word/LLM tokenization.
pub struct Bm25Tokenizer {
    use_stopwords: bool,
    stopwords: HashSet<String>,
}

impl Bm25Tokenizer {
    pub fn new(use_stopwords: bool) -> Self {
        Self {
            use_stopwords,
            stopwords: DEFAULT_STOPWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let mut tokens = Vec::new();
        let mut current = String::new();

        for c in lowered.chars() {
            if c.is_alphanumeric() || c == '_' {
                current.push(c);
            } else if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            tokens.push(current);
        }

        if self.use_stopwords {
            tokens.retain(|t| !self.stopwords.contains(t));
        }
        tokens
    }
}

/// Okapi BM25 sparse index over a fixed corpus of tokenized chunks.
pub struct Bm25Index {
    k1: f32,
    b: f32,
    tokenizer: Bm25Tokenizer,
    chunk_ids: Vec<String>,
    chunk_id_to_position: HashMap<String, usize>,
    doc_term_freqs: Vec<HashMap<String, u32>>,
    doc_lengths: Vec<u32>,
    doc_freqs: HashMap<String, u32>,
    avg_doc_length: f32,
}

const MAGIC: &[u8; 4] = b"STBM";
const FORMAT_VERSION: u16 = 1;

impl Bm25Index {
    /// Build a fresh index over `(chunk_id, text)` pairs, in corpus order.
    pub fn build(
        chunks: &[(String, String)],
        k1: f32,
        b: f32,
        use_stopwords: bool,
    ) -> Result<Self, StrataError> {
        if chunks.is_empty() {
            return Err(StrataError::corrupt_store(
                "cannot build a BM25 index from an empty chunk list",
            ));
        }

        let tokenizer = Bm25Tokenizer::new(use_stopwords);
        let mut chunk_ids = Vec::with_capacity(chunks.len());
        let mut chunk_id_to_position = HashMap::with_capacity(chunks.len());
        let mut doc_term_freqs = Vec::with_capacity(chunks.len());
        let mut doc_lengths = Vec::with_capacity(chunks.len());
        let mut doc_freqs: HashMap<String, u32> = HashMap::new();

        for (position, (chunk_id, text)) in chunks.iter().enumerate() {
            let tokens = tokenizer.tokenize(text);
            let mut term_freqs: HashMap<String, u32> = HashMap::new();
            for token in &tokens {
                *term_freqs.entry(token.clone()).or_insert(0) += 1;
            }
            for term in term_freqs.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }

            doc_lengths.push(tokens.len() as u32);
            doc_term_freqs.push(term_freqs);
            chunk_ids.push(chunk_id.clone());
            chunk_id_to_position.insert(chunk_id.clone(), position);
        }

        let avg_doc_length =
            doc_lengths.iter().map(|&l| l as f64).sum::<f64>() as f32 / doc_lengths.len() as f32;

        info!(chunks = chunks.len(), avg_doc_length, "built bm25 index");

        Ok(Self {
            k1,
            b,
            tokenizer,
            chunk_ids,
            chunk_id_to_position,
            doc_term_freqs,
            doc_lengths,
            doc_freqs,
            avg_doc_length,
        })
    }

    fn idf(&self, term: &str) -> f32 {
        let n = self.chunk_ids.len() as f32;
        let df = *self.doc_freqs.get(term).unwrap_or(&0) as f32;
        ((n - df + 0.5) / (df + 0.5)).ln()
    }

    /// Score every chunk against `query`, sorted descending by score with
    /// ties broken by ascending corpus position.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<(String, f32)> {
        let query_tokens = self.tokenizer.tokenize(query);
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let mut scores = vec![0f32; self.chunk_ids.len()];
        for term in &query_tokens {
            let idf = self.idf(term);
            for (position, term_freqs) in self.doc_term_freqs.iter().enumerate() {
                let freq = *term_freqs.get(term).unwrap_or(&0) as f32;
                if freq == 0.0 {
                    continue;
                }
                let doc_len = self.doc_lengths[position] as f32;
                let denom =
                    freq + self.k1 * (1.0 - self.b + self.b * doc_len / self.avg_doc_length);
                scores[position] += idf * (freq * (self.k1 + 1.0)) / denom;
            }
        }

        let mut ranked: Vec<usize> = (0..scores.len()).collect();
        ranked.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });

        ranked
            .into_iter()
            .take(top_k)
            .map(|position| (self.chunk_ids[position].clone(), scores[position]))
            .collect()
    }

    pub fn tokenizer(&self) -> &Bm25Tokenizer {
        &self.tokenizer
    }

    pub fn contains_chunk(&self, chunk_id: &str) -> bool {
        self.chunk_id_to_position.contains_key(chunk_id)
    }

    /// Persist as a versioned binary artifact: magic, version, BM25
    /// parameters, vocabulary, per-chunk term frequencies, doc lengths, and
    /// the chunk id table — each section length-prefixed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StrataError> {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&self.k1.to_le_bytes());
        out.extend_from_slice(&self.b.to_le_bytes());
        out.extend_from_slice(&self.avg_doc_length.to_le_bytes());
        out.extend_from_slice(&(self.chunk_ids.len() as u32).to_le_bytes());

        // Vocabulary: term -> (term_index, doc_freq)
        let mut vocab: Vec<&String> = self.doc_freqs.keys().collect();
        vocab.sort();
        let term_to_index: HashMap<&str, u32> = vocab
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), i as u32))
            .collect();

        write_section(&mut out, |buf| {
            buf.extend_from_slice(&(vocab.len() as u32).to_le_bytes());
            for term in &vocab {
                write_string(buf, term);
                buf.extend_from_slice(&self.doc_freqs[*term].to_le_bytes());
            }
        });

        // Per-chunk term frequencies, referencing vocabulary indices.
        write_section(&mut out, |buf| {
            for term_freqs in &self.doc_term_freqs {
                buf.extend_from_slice(&(term_freqs.len() as u32).to_le_bytes());
                let mut entries: Vec<(u32, u32)> = term_freqs
                    .iter()
                    .map(|(term, freq)| (term_to_index[term.as_str()], *freq))
                    .collect();
                entries.sort_by_key(|(idx, _)| *idx);
                for (term_index, freq) in entries {
                    buf.extend_from_slice(&term_index.to_le_bytes());
                    buf.extend_from_slice(&freq.to_le_bytes());
                }
            }
        });

        // Doc lengths.
        write_section(&mut out, |buf| {
            for len in &self.doc_lengths {
                buf.extend_from_slice(&len.to_le_bytes());
            }
        });

        // Chunk id table, in corpus order.
        write_section(&mut out, |buf| {
            for chunk_id in &self.chunk_ids {
                write_string(buf, chunk_id);
            }
        });

        let tmp_path = path.as_ref().with_extension("bin.tmp");
        std::fs::write(&tmp_path, &out)?;
        std::fs::rename(&tmp_path, path.as_ref())?;
        debug!(bytes = out.len(), "persisted bm25 index");
        Ok(())
    }

    /// Load and validate a binary index written by [`Bm25Index::save`].
    ///
    /// Rejects the file outright on magic/version/length mismatch rather
    /// than attempting a partial or best-effort load.
    pub fn load(
        path: impl AsRef<Path>,
        use_stopwords: bool,
    ) -> Result<Self, StrataError> {
        let bytes = std::fs::read(path.as_ref())?;
        let mut reader = ByteReader::new(&bytes);

        let magic = reader.take(4)?;
        if magic != MAGIC {
            return Err(StrataError::corrupt_store("bm25 index: bad magic"));
        }
        let version = reader.take_u16()?;
        if version != FORMAT_VERSION {
            return Err(StrataError::corrupt_store(format!(
                "bm25 index: unsupported format version {version}"
            )));
        }

        let k1 = reader.take_f32()?;
        let b = reader.take_f32()?;
        let avg_doc_length = reader.take_f32()?;
        let chunk_count = reader.take_u32()? as usize;

        let vocab_section = reader.take_section()?;
        let mut vocab_reader = ByteReader::new(vocab_section);
        let vocab_len = vocab_reader.take_u32()? as usize;
        let mut vocab = Vec::with_capacity(vocab_len);
        let mut doc_freqs = HashMap::with_capacity(vocab_len);
        for _ in 0..vocab_len {
            let term = vocab_reader.take_string()?;
            let df = vocab_reader.take_u32()?;
            doc_freqs.insert(term.clone(), df);
            vocab.push(term);
        }

        let term_freqs_section = reader.take_section()?;
        let mut tf_reader = ByteReader::new(term_freqs_section);
        let mut doc_term_freqs = Vec::with_capacity(chunk_count);
        for _ in 0..chunk_count {
            let entry_count = tf_reader.take_u32()? as usize;
            let mut term_freqs = HashMap::with_capacity(entry_count);
            for _ in 0..entry_count {
                let term_index = tf_reader.take_u32()? as usize;
                let freq = tf_reader.take_u32()?;
                let term = vocab.get(term_index).ok_or_else(|| {
                    StrataError::corrupt_store("bm25 index: term index out of range")
                })?;
                term_freqs.insert(term.clone(), freq);
            }
            doc_term_freqs.push(term_freqs);
        }

        let lengths_section = reader.take_section()?;
        let mut len_reader = ByteReader::new(lengths_section);
        let mut doc_lengths = Vec::with_capacity(chunk_count);
        for _ in 0..chunk_count {
            doc_lengths.push(len_reader.take_u32()?);
        }

        let ids_section = reader.take_section()?;
        let mut ids_reader = ByteReader::new(ids_section);
        let mut chunk_ids = Vec::with_capacity(chunk_count);
        let mut chunk_id_to_position = HashMap::with_capacity(chunk_count);
        for position in 0..chunk_count {
            let chunk_id = ids_reader.take_string()?;
            chunk_id_to_position.insert(chunk_id.clone(), position);
            chunk_ids.push(chunk_id);
        }

        Ok(Self {
            k1,
            b,
            tokenizer: Bm25Tokenizer::new(use_stopwords),
            chunk_ids,
            chunk_id_to_position,
            doc_term_freqs,
            doc_lengths,
            doc_freqs,
            avg_doc_length,
        })
    }
}

fn write_section(out: &mut Vec<u8>, build: impl FnOnce(&mut Vec<u8>)) {
    let mut section = Vec::new();
    build(&mut section);
    out.extend_from_slice(&(section.len() as u64).to_le_bytes());
    out.extend_from_slice(&section);
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], StrataError> {
        if self.pos + n > self.data.len() {
            return Err(StrataError::corrupt_store(
                "bm25 index: truncated while reading section",
            ));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_u16(&mut self) -> Result<u16, StrataError> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn take_u32(&mut self) -> Result<u32, StrataError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn take_u64(&mut self) -> Result<u64, StrataError> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn take_f32(&mut self) -> Result<f32, StrataError> {
        Ok(f32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn take_string(&mut self) -> Result<String, StrataError> {
        let len = self.take_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| StrataError::corrupt_store(e.to_string()))
    }

    fn take_section(&mut self) -> Result<&'a [u8], StrataError> {
        let len = self.take_u64()? as usize;
        self.take(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chunks() -> Vec<(String, String)> {
        vec![
            ("c1".to_string(), "the quick brown fox jumps".to_string()),
            ("c2".to_string(), "the lazy dog sleeps".to_string()),
            ("c3".to_string(), "quick foxes and lazy dogs".to_string()),
        ]
    }

    #[test]
    fn search_ranks_relevant_chunk_first() {
        let index = Bm25Index::build(&sample_chunks(), 1.5, 0.75, false).unwrap();
        let results = index.search("quick fox", 3);
        assert_eq!(results[0].0, "c1");
    }

    #[test]
    fn ties_break_by_corpus_position() {
        let chunks = vec![
            ("a".to_string(), "zzz".to_string()),
            ("b".to_string(), "zzz".to_string()),
        ];
        let index = Bm25Index::build(&chunks, 1.5, 0.75, false).unwrap();
        let results = index.search("zzz", 2);
        assert_eq!(results[0].0, "a");
        assert_eq!(results[1].0, "b");
    }

    #[test]
    fn empty_query_returns_no_results() {
        let index = Bm25Index::build(&sample_chunks(), 1.5, 0.75, false).unwrap();
        assert!(index.search("   ", 5).is_empty());
    }

    #[test]
    fn save_and_load_round_trip_preserves_scores() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bm25_index.bin");
        let index = Bm25Index::build(&sample_chunks(), 1.5, 0.75, false).unwrap();
        index.save(&path).unwrap();

        let loaded = Bm25Index::load(&path, false).unwrap();
        let original = index.search("quick fox", 3);
        let reloaded = loaded.search("quick fox", 3);
        assert_eq!(original, reloaded);
    }

    #[test]
    fn load_rejects_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bm25_index.bin");
        std::fs::write(&path, b"NOPE0000").unwrap();
        assert!(Bm25Index::load(&path, false).is_err());
    }

    #[test]
    fn building_from_empty_corpus_is_an_error() {
        assert!(Bm25Index::build(&[], 1.5, 0.75, false).is_err());
    }
}
