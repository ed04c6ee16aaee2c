use std::path::Path;

use chrono::Utc;
use tracing::{info, warn};

use crate::bm25::Bm25Index;
use crate::chunker::FixedSizeChunker;
use crate::lock::ArtifactLock;
use crate::manifest::Manifest;
use crate::models::Chunk;
use crate::parser::{CorpusWalker, Parser, RouteDecision, TextParser};
use crate::pipeline::RetrievalPipeline;
use crate::store::{ChunkStore, DocMetaEntry};
use strata_config::{validate_config, BuildConfig};
use strata_core::StrataError;
use strata_observability::BuildMetrics;

const BM25_INDEX_FILENAME: &str = "bm25_index.bin";
const MANIFEST_FILENAME: &str = "manifest.json";

/// A built or loaded artifact: the chunk store plus its BM25 index, ready to
/// serve retrieval queries.
pub struct Artifact {
    store: ChunkStore,
    index: Bm25Index,
}

impl Artifact {
    pub fn pipeline(&self) -> RetrievalPipeline<'_> {
        RetrievalPipeline::new(&self.index, &self.store)
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ChunkStore {
        &mut self.store
    }

    /// Re-run the chunk store's on-disk integrity checks on demand.
    pub fn validate_invariants(&self) -> Result<(), StrataError> {
        self.store.validate_invariants()
    }
}

/// Orchestrates ingest → chunk → index → persist, and loads a built artifact
/// back for serving.
pub struct ArtifactBuilder {
    config: BuildConfig,
}

impl ArtifactBuilder {
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    /// Build a fresh artifact from a corpus directory into `artifact_dir`.
    ///
    /// Corpus traversal is lexicographic by normalized relative path, so
    /// `chunk_index` and BM25 corpus positions are reproducible. Per-file
    /// parse failures are skipped with a warning; the build continues.
    pub fn build(
        &self,
        corpus_dir: &Path,
        artifact_dir: &Path,
    ) -> Result<(Artifact, BuildMetrics), StrataError> {
        validate_config(&self.config)?;

        std::fs::create_dir_all(artifact_dir)?;
        let _lock = ArtifactLock::acquire(artifact_dir)?;

        let mut metrics = BuildMetrics::new();
        let mut store = ChunkStore::create(artifact_dir, self.config.zstd_level);
        let chunker = FixedSizeChunker::new(self.config.chunk_size, self.config.chunk_overlap);
        let text_parser = TextParser;

        let mut all_chunks: Vec<Chunk> = Vec::new();
        let mut total_docs = 0u64;

        let walker = CorpusWalker::new(corpus_dir);
        for decision in walker.walk()? {
            match decision {
                RouteDecision::Text(path) => {
                    match text_parser.parse(&path, corpus_dir) {
                        Ok(document) => {
                            metrics.record_document_parsed();
                            total_docs += 1;

                            store.upsert_doc_meta(
                                &document.doc_uid,
                                DocMetaEntry {
                                    doc_id: document.doc_id.clone(),
                                    source_path: document.source_path.clone(),
                                    title: document.title.clone(),
                                    page_count: if document.pages.is_empty() {
                                        None
                                    } else {
                                        Some(document.pages.len() as u32)
                                    },
                                },
                            );

                            let chunks = chunker.chunk_document(&document)?;
                            for chunk in chunks {
                                let compressed_len = store.write_chunk(&chunk)?;
                                metrics.record_compression(chunk.text.len() as u64, compressed_len as u64);
                                all_chunks.push(chunk);
                            }
                        }
                        Err(e) => {
                            warn!(path = %path.display(), error = %e, "skipping file that failed to parse");
                            metrics.record_document_skipped();
                        }
                    }
                }
                RouteDecision::UnsupportedPaged(path) => {
                    warn!(path = %path.display(), "paged parser not implemented, skipping");
                    metrics.record_document_skipped();
                }
            }
        }

        metrics.record_chunks_written(all_chunks.len() as u64);

        let chunk_texts: Vec<(String, String)> = all_chunks
            .iter()
            .map(|c| (c.chunk_id.clone(), c.text.clone()))
            .collect();

        let index = Bm25Index::build(
            &chunk_texts,
            self.config.bm25_k1,
            self.config.bm25_b,
            self.config.bm25_use_stopwords,
        )?;
        index.save(artifact_dir.join(BM25_INDEX_FILENAME))?;

        store.flush_docs_meta()?;

        let manifest = Manifest::compute(
            artifact_dir,
            total_docs,
            all_chunks.len() as u64,
            "bm25",
            self.config.compression.clone(),
            self.config.schema_version.clone(),
            self.config.artifact_version.clone(),
            Utc::now(),
        )?;
        manifest.save(&artifact_dir.join(MANIFEST_FILENAME))?;

        metrics.finish();
        info!(
            total_docs,
            total_chunks = all_chunks.len(),
            duration_ms = metrics.build_duration_ms,
            "build complete"
        );

        Ok((Artifact { store, index }, metrics))
    }

    /// Load a previously built artifact, optionally verifying the manifest.
    pub fn load(&self, artifact_dir: &Path, strict: bool) -> Result<Artifact, StrataError> {
        if strict {
            let manifest = Manifest::load(&artifact_dir.join(MANIFEST_FILENAME))?;
            manifest.verify(artifact_dir)?;
        }

        let store = ChunkStore::load(artifact_dir)?;
        store.validate_invariants()?;
        let index = Bm25Index::load(
            artifact_dir.join(BM25_INDEX_FILENAME),
            self.config.bm25_use_stopwords,
        )?;

        for chunk_id in store.live_chunk_ids() {
            if !index.contains_chunk(&chunk_id) {
                return Err(StrataError::index_inconsistency(chunk_id));
            }
        }

        Ok(Artifact { store, index })
    }
}
