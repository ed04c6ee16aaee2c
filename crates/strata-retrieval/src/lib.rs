//! Builds and serves a portable, local-first retrieval artifact: a corpus
//! directory goes in, a directory of on-disk files (a compressed chunk
//! store, a BM25 sparse index, and a manifest) comes out, and queries against
//! it return ranked chunks with citation-grade source references.
//!
//! No network calls, no embeddings, no vector math: retrieval is pure
//! term-based Okapi BM25 over fixed-size chunks of normalized document text.

pub mod bm25;
pub mod builder;
pub mod chartext;
pub mod chunker;
pub mod compression;
pub mod ids;
pub mod lock;
pub mod manifest;
pub mod models;
pub mod normalizer;
pub mod parser;
pub mod pipeline;
pub mod store;

pub use bm25::{Bm25Index, Bm25Tokenizer};
pub use builder::{Artifact, ArtifactBuilder};
pub use chunker::FixedSizeChunker;
pub use lock::ArtifactLock;
pub use manifest::Manifest;
pub use models::{Chunk, Document, Page, RetrievalResult, SourceRef};
pub use parser::{CorpusWalker, PagedParser, Parser, RawPage, RouteDecision, TextParser};
pub use pipeline::{normalize_scores_for_display, RetrievalPipeline};
pub use store::{ChunkStore, DocMetaEntry};
