use sha2::{Digest, Sha256};

/// Resolve `.`/`..` segments and convert backslashes to forward slashes.
///
/// Pure string manipulation; does not touch the filesystem, so it works the
/// same for paths that don't exist yet (e.g. inside an artifact built on a
/// different machine).
pub fn normalize_path(rel_path: &str) -> String {
    let slashed = rel_path.replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();
    for part in slashed.split('/') {
        match part {
            "." | "" => continue,
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

fn truncate16(hex: &str) -> String {
    hex[..16].to_string()
}

/// Stable document identifier, depending only on `source_path`.
pub fn generate_doc_uid(rel_path: &str) -> String {
    let normalized_path = normalize_path(rel_path);
    truncate16(&sha256_hex(&normalized_path))
}

/// Versioned document identifier, changing whenever normalized text changes.
///
/// `normalized_text_hash` is the lowercase hex SHA-256 digest of the
/// document's normalized text, concatenated as text (not raw bytes).
pub fn generate_doc_id(doc_uid: &str, normalized_text_hash: &str) -> String {
    let combined = format!("{doc_uid}{normalized_text_hash}");
    truncate16(&sha256_hex(&combined))
}

/// Content-addressed chunk identifier.
///
/// Built from `doc_uid` (not `doc_id`) plus the chunk's offsets and a hash of
/// its own text, so the id is stable as long as the chunk's position and
/// content don't change, independent of the rest of the document.
pub fn generate_chunk_id(
    doc_uid: &str,
    offset_start: usize,
    offset_end: usize,
    chunk_text: &str,
) -> String {
    let chunk_text_hash = sha256_hex(chunk_text);
    let combined = format!("{doc_uid}{offset_start}{offset_end}{chunk_text_hash}");
    truncate16(&sha256_hex(&combined))
}

/// Lowercase hex SHA-256 of a string, for callers needing a standalone text hash.
pub fn sha256_hex_of(text: &str) -> String {
    sha256_hex(text)
}
