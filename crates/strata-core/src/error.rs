use thiserror::Error;

/// Error taxonomy shared across the artifact subsystem.
///
/// Recoverable-per-file parse failures are modeled separately from the rest:
/// everything but `Parse` is meant to abort the enclosing build or read.
#[derive(Error, Debug)]
pub enum StrataError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("chunker invariant violated for doc_uid {doc_uid}: {message}")]
    ChunkerInvariantViolation { doc_uid: String, message: String },

    #[error("corrupt store: {message}")]
    CorruptStore { message: String },

    #[error("decompression failed: {message}")]
    Decompression { message: String },

    #[error("bm25 index references unknown chunk_id {chunk_id}")]
    IndexInconsistency { chunk_id: String },

    #[error("manifest mismatch: {message}")]
    ManifestMismatch { message: String },

    #[error("invalid configuration: {field}: {message}")]
    Config { field: String, message: String },
}

impl StrataError {
    pub fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn chunker_invariant(doc_uid: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ChunkerInvariantViolation {
            doc_uid: doc_uid.into(),
            message: message.into(),
        }
    }

    pub fn corrupt_store(message: impl Into<String>) -> Self {
        Self::CorruptStore {
            message: message.into(),
        }
    }

    pub fn decompression(message: impl Into<String>) -> Self {
        Self::Decompression {
            message: message.into(),
        }
    }

    pub fn index_inconsistency(chunk_id: impl Into<String>) -> Self {
        Self::IndexInconsistency {
            chunk_id: chunk_id.into(),
        }
    }

    pub fn manifest_mismatch(message: impl Into<String>) -> Self {
        Self::ManifestMismatch {
            message: message.into(),
        }
    }

    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result type used across the artifact subsystem.
pub type Result<T> = std::result::Result<T, StrataError>;

impl From<serde_json::Error> for StrataError {
    fn from(error: serde_json::Error) -> Self {
        Self::corrupt_store(error.to_string())
    }
}
