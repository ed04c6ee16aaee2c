use serde::{Deserialize, Serialize};

/// Configuration surface recognised by the artifact builder and BM25 index.
///
/// Every field has a compiled-in default, may be overridden by an optional
/// TOML file, and may be overridden again by a `STRATA_`-prefixed
/// environment variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Target words per chunk.
    pub chunk_size: usize,
    /// Words of overlap carried into the next chunk.
    pub chunk_overlap: usize,

    /// Okapi BM25 term-frequency saturation parameter.
    pub bm25_k1: f32,
    /// Okapi BM25 length-normalization parameter.
    pub bm25_b: f32,
    /// Whether to drop a small stopword set during tokenization.
    pub bm25_use_stopwords: bool,

    /// Compression codec used for stored chunk payloads. Only "zstd" is supported.
    pub compression: String,
    /// zstd compression level, 1 (fastest) to 22 (smallest).
    pub zstd_level: i32,

    pub schema_version: String,
    pub artifact_version: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 50,
            bm25_k1: 1.5,
            bm25_b: 0.75,
            bm25_use_stopwords: false,
            compression: "zstd".to_string(),
            zstd_level: 3,
            schema_version: "1.0".to_string(),
            artifact_version: "1.0".to_string(),
        }
    }
}
