use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::compression::{compress, decompress};
use crate::models::{Chunk, SourceRef};
use strata_core::StrataError;

const RECORD_SIZE: usize = 141;
const ID_FIELD_WIDTH: usize = 32;

/// One 141-byte little-endian `chunks.idx` record, packed with no padding.
#[derive(Debug, Clone, Copy)]
struct IndexRecord {
    chunk_id: [u8; ID_FIELD_WIDTH],
    doc_uid: [u8; ID_FIELD_WIDTH],
    doc_id: [u8; ID_FIELD_WIDTH],
    store_offset: u64,
    length: u32,
    checksum: u32,
    is_active: u8,
    /// Character positions (not byte positions) within the document's
    /// `normalized_text`.
    offset_start: u64,
    offset_end: u64,
    chunk_index: u32,
    page_start: i32,
    page_end: i32,
}

fn pad_id(id: &str) -> [u8; ID_FIELD_WIDTH] {
    let mut buf = [0u8; ID_FIELD_WIDTH];
    let bytes = id.as_bytes();
    let n = bytes.len().min(ID_FIELD_WIDTH);
    buf[..n].copy_from_slice(&bytes[..n]);
    buf
}

fn unpad_id(buf: &[u8; ID_FIELD_WIDTH]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(ID_FIELD_WIDTH);
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

impl IndexRecord {
    fn to_bytes(self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        let mut pos = 0;

        macro_rules! put {
            ($bytes:expr) => {{
                let b = $bytes;
                out[pos..pos + b.len()].copy_from_slice(&b);
                pos += b.len();
            }};
        }

        put!(self.chunk_id);
        put!(self.doc_uid);
        put!(self.doc_id);
        put!(self.store_offset.to_le_bytes());
        put!(self.length.to_le_bytes());
        put!(self.checksum.to_le_bytes());
        put!([self.is_active]);
        put!(self.offset_start.to_le_bytes());
        put!(self.offset_end.to_le_bytes());
        put!(self.chunk_index.to_le_bytes());
        put!(self.page_start.to_le_bytes());
        put!(self.page_end.to_le_bytes());

        debug_assert_eq!(pos, RECORD_SIZE);
        out
    }

    fn from_bytes(bytes: &[u8; RECORD_SIZE]) -> Self {
        let mut pos = 0;

        macro_rules! take {
            ($n:expr) => {{
                let slice = &bytes[pos..pos + $n];
                pos += $n;
                slice
            }};
        }

        let mut chunk_id = [0u8; ID_FIELD_WIDTH];
        chunk_id.copy_from_slice(take!(ID_FIELD_WIDTH));
        let mut doc_uid = [0u8; ID_FIELD_WIDTH];
        doc_uid.copy_from_slice(take!(ID_FIELD_WIDTH));
        let mut doc_id = [0u8; ID_FIELD_WIDTH];
        doc_id.copy_from_slice(take!(ID_FIELD_WIDTH));
        let store_offset = u64::from_le_bytes(take!(8).try_into().unwrap());
        let length = u32::from_le_bytes(take!(4).try_into().unwrap());
        let checksum = u32::from_le_bytes(take!(4).try_into().unwrap());
        let is_active = take!(1)[0];
        let offset_start = u64::from_le_bytes(take!(8).try_into().unwrap());
        let offset_end = u64::from_le_bytes(take!(8).try_into().unwrap());
        let chunk_index = u32::from_le_bytes(take!(4).try_into().unwrap());
        let page_start = i32::from_le_bytes(take!(4).try_into().unwrap());
        let page_end = i32::from_le_bytes(take!(4).try_into().unwrap());

        Self {
            chunk_id,
            doc_uid,
            doc_id,
            store_offset,
            length,
            checksum,
            is_active,
            offset_start,
            offset_end,
            chunk_index,
            page_start,
            page_end,
        }
    }
}

#[derive(Debug, Clone)]
struct LiveRecord {
    doc_uid: String,
    doc_id: String,
    store_offset: u64,
    length: u32,
    checksum: u32,
    is_active: bool,
    offset_start: usize,
    offset_end: usize,
    chunk_index: u32,
    page_start: Option<i32>,
    page_end: Option<i32>,
}

/// Document metadata persisted in `docs.meta`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocMetaEntry {
    pub doc_id: String,
    pub source_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
}

/// Append-only chunk store: `chunks.bin` + `chunks.idx` + `docs.meta`.
pub struct ChunkStore {
    store_dir: PathBuf,
    index: HashMap<String, LiveRecord>,
    doc_uid_to_chunks: HashMap<String, Vec<String>>,
    docs_meta: HashMap<String, DocMetaEntry>,
    zstd_level: i32,
}

impl ChunkStore {
    fn chunks_bin_path(dir: &Path) -> PathBuf {
        dir.join("chunks.bin")
    }

    fn chunks_idx_path(dir: &Path) -> PathBuf {
        dir.join("chunks.idx")
    }

    fn docs_meta_path(dir: &Path) -> PathBuf {
        dir.join("docs.meta")
    }

    /// Create a fresh, empty store rooted at `store_dir` (directory must exist).
    pub fn create(store_dir: impl Into<PathBuf>, zstd_level: i32) -> Self {
        Self {
            store_dir: store_dir.into(),
            index: HashMap::new(),
            doc_uid_to_chunks: HashMap::new(),
            docs_meta: HashMap::new(),
            zstd_level,
        }
    }

    /// Load an existing store, replaying `chunks.idx` with last-record-wins
    /// reconciliation and loading `docs.meta`.
    pub fn load(store_dir: impl Into<PathBuf>) -> Result<Self, StrataError> {
        let store_dir = store_dir.into();
        let docs_meta = load_docs_meta(&Self::docs_meta_path(&store_dir))?;

        let mut store = Self {
            store_dir: store_dir.clone(),
            index: HashMap::new(),
            doc_uid_to_chunks: HashMap::new(),
            docs_meta,
            zstd_level: 3,
        };

        let idx_path = Self::chunks_idx_path(&store_dir);
        if !idx_path.exists() {
            return Ok(store);
        }

        let mut file = File::open(&idx_path)?;
        let mut buf = [0u8; RECORD_SIZE];
        loop {
            let n = read_fully(&mut file, &mut buf)?;
            if n == 0 {
                break;
            }
            if n < RECORD_SIZE {
                return Err(StrataError::corrupt_store(
                    "chunks.idx truncated mid-record",
                ));
            }

            let record = IndexRecord::from_bytes(&buf);
            let chunk_id = unpad_id(&record.chunk_id);
            let doc_uid = unpad_id(&record.doc_uid);
            let doc_id = unpad_id(&record.doc_id);

            store.index.insert(
                chunk_id.clone(),
                LiveRecord {
                    doc_uid: doc_uid.clone(),
                    doc_id,
                    store_offset: record.store_offset,
                    length: record.length,
                    checksum: record.checksum,
                    is_active: record.is_active != 0,
                    offset_start: record.offset_start as usize,
                    offset_end: record.offset_end as usize,
                    chunk_index: record.chunk_index,
                    page_start: if record.page_start == -1 {
                        None
                    } else {
                        Some(record.page_start)
                    },
                    page_end: if record.page_end == -1 {
                        None
                    } else {
                        Some(record.page_end)
                    },
                },
            );

            let chunk_ids = store.doc_uid_to_chunks.entry(doc_uid).or_default();
            if !chunk_ids.contains(&chunk_id) {
                chunk_ids.push(chunk_id);
            }
        }

        debug!(records = store.index.len(), "loaded chunk store index");
        Ok(store)
    }

    /// Compress, append, and index a chunk. Flushes before returning so a
    /// crash mid-build cannot interleave with the next record. Returns the
    /// compressed payload length, in bytes, for callers tracking build
    /// metrics.
    pub fn write_chunk(&mut self, chunk: &Chunk) -> Result<usize, StrataError> {
        let compressed = compress(chunk.text.as_bytes(), self.zstd_level)?;
        let checksum = xxhash_rust::xxh32::xxh32(chunk.text.as_bytes(), 0);

        let bin_path = Self::chunks_bin_path(&self.store_dir);
        let store_offset = if bin_path.exists() {
            std::fs::metadata(&bin_path)?.len()
        } else {
            0
        };

        let mut bin_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&bin_path)?;
        bin_file.write_all(&compressed)?;
        bin_file.flush()?;

        let record = IndexRecord {
            chunk_id: pad_id(&chunk.chunk_id),
            doc_uid: pad_id(&chunk.doc_uid),
            doc_id: pad_id(&chunk.doc_id),
            store_offset,
            length: compressed.len() as u32,
            checksum,
            is_active: 1,
            offset_start: chunk.offset_start as u64,
            offset_end: chunk.offset_end as u64,
            chunk_index: chunk.chunk_index,
            page_start: chunk.page_start.unwrap_or(-1),
            page_end: chunk.page_end.unwrap_or(-1),
        };
        self.append_record(record)?;

        self.index.insert(
            chunk.chunk_id.clone(),
            LiveRecord {
                doc_uid: chunk.doc_uid.clone(),
                doc_id: chunk.doc_id.clone(),
                store_offset,
                length: compressed.len() as u32,
                checksum,
                is_active: true,
                offset_start: chunk.offset_start,
                offset_end: chunk.offset_end,
                chunk_index: chunk.chunk_index,
                page_start: chunk.page_start,
                page_end: chunk.page_end,
            },
        );
        self.doc_uid_to_chunks
            .entry(chunk.doc_uid.clone())
            .or_default()
            .push(chunk.chunk_id.clone());

        debug!(chunk_id = %chunk.chunk_id, store_offset, length = compressed.len(), "wrote chunk");
        Ok(compressed.len())
    }

    fn append_record(&self, record: IndexRecord) -> Result<(), StrataError> {
        let idx_path = Self::chunks_idx_path(&self.store_dir);
        let mut idx_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(idx_path)?;
        idx_file.write_all(&record.to_bytes())?;
        idx_file.flush()?;
        Ok(())
    }

    /// Read a chunk by id, returning `None` if unknown or tombstoned.
    pub fn read_chunk(&self, chunk_id: &str) -> Result<Option<Chunk>, StrataError> {
        let Some(record) = self.index.get(chunk_id) else {
            return Ok(None);
        };
        if !record.is_active {
            return Ok(None);
        }

        let bin_path = Self::chunks_bin_path(&self.store_dir);
        let mut bin_file = File::open(&bin_path)?;
        bin_file.seek(SeekFrom::Start(record.store_offset))?;
        let mut compressed = vec![0u8; record.length as usize];
        bin_file.read_exact(&mut compressed)?;

        let decompressed = decompress(&compressed)?;
        let computed_checksum = xxhash_rust::xxh32::xxh32(&decompressed, 0);
        if computed_checksum != record.checksum {
            return Err(StrataError::corrupt_store(format!(
                "checksum mismatch for chunk {chunk_id}"
            )));
        }

        let text = String::from_utf8(decompressed)
            .map_err(|e| StrataError::corrupt_store(e.to_string()))?;

        let source_path = self
            .docs_meta
            .get(&record.doc_uid)
            .map(|entry| entry.source_path.clone())
            .unwrap_or_default();

        let source_ref = SourceRef {
            source_path,
            offset_start: record.offset_start,
            offset_end: record.offset_end,
            page_start: record.page_start,
            page_end: record.page_end,
        };

        Ok(Some(Chunk {
            chunk_id: chunk_id.to_string(),
            doc_uid: record.doc_uid.clone(),
            doc_id: record.doc_id.clone(),
            text,
            offset_start: record.offset_start,
            offset_end: record.offset_end,
            chunk_index: record.chunk_index,
            source_ref,
            page_start: record.page_start,
            page_end: record.page_end,
        }))
    }

    /// Append a tombstone record for a single chunk.
    pub fn tombstone_chunk(&mut self, chunk_id: &str) -> Result<(), StrataError> {
        let Some(record) = self.index.get(chunk_id).cloned() else {
            return Ok(());
        };

        let tombstone = IndexRecord {
            chunk_id: pad_id(chunk_id),
            doc_uid: pad_id(&record.doc_uid),
            doc_id: pad_id(&record.doc_id),
            store_offset: record.store_offset,
            length: record.length,
            checksum: record.checksum,
            is_active: 0,
            offset_start: record.offset_start as u64,
            offset_end: record.offset_end as u64,
            chunk_index: record.chunk_index,
            page_start: record.page_start.unwrap_or(-1),
            page_end: record.page_end.unwrap_or(-1),
        };
        self.append_record(tombstone)?;

        if let Some(entry) = self.index.get_mut(chunk_id) {
            entry.is_active = false;
        }
        info!(chunk_id, "tombstoned chunk");
        Ok(())
    }

    /// Tombstone every chunk belonging to a document.
    pub fn tombstone_document(&mut self, doc_uid: &str) -> Result<(), StrataError> {
        let Some(chunk_ids) = self.doc_uid_to_chunks.get(doc_uid).cloned() else {
            return Ok(());
        };
        for chunk_id in chunk_ids {
            self.tombstone_chunk(&chunk_id)?;
        }
        Ok(())
    }

    /// Register document metadata to be persisted in `docs.meta`.
    pub fn upsert_doc_meta(&mut self, doc_uid: &str, entry: DocMetaEntry) {
        self.docs_meta.insert(doc_uid.to_string(), entry);
    }

    /// Atomically rewrite `docs.meta` (temp file + rename).
    pub fn flush_docs_meta(&self) -> Result<(), StrataError> {
        let path = Self::docs_meta_path(&self.store_dir);
        let tmp_path = path.with_extension("meta.tmp");
        let json = serde_json::to_vec_pretty(&self.docs_meta)?;
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// Chunk ids for every live chunk, in corpus position order is not
    /// guaranteed by this accessor; callers that need corpus order should
    /// derive it from the BM25 index's chunk list instead.
    pub fn live_chunk_ids(&self) -> Vec<String> {
        self.index
            .iter()
            .filter(|(_, record)| record.is_active)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Validate that every live record's payload lies within `chunks.bin`.
    pub fn validate_invariants(&self) -> Result<(), StrataError> {
        let bin_path = Self::chunks_bin_path(&self.store_dir);
        let bin_size = if bin_path.exists() {
            std::fs::metadata(&bin_path)?.len()
        } else {
            0
        };

        for (chunk_id, record) in &self.index {
            if !record.is_active {
                continue;
            }
            if record.store_offset + record.length as u64 > bin_size {
                return Err(StrataError::corrupt_store(format!(
                    "chunk {chunk_id}: store_offset {} + length {} exceeds chunks.bin size {bin_size}",
                    record.store_offset, record.length
                )));
            }
        }
        Ok(())
    }
}

fn load_docs_meta(path: &Path) -> Result<HashMap<String, DocMetaEntry>, StrataError> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let bytes = std::fs::read(path)?;
    if bytes.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(serde_json::from_slice(&bytes)?)
}

fn read_fully(file: &mut File, buf: &mut [u8]) -> Result<usize, StrataError> {
    let mut total = 0;
    while total < buf.len() {
        let n = file.read(&mut buf[total..])?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}
