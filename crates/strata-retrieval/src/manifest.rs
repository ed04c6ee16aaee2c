use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use strata_core::StrataError;

const ARTIFACT_FILES: &[&str] = &["chunks.bin", "chunks.idx", "bm25_index.bin", "docs.meta"];

/// File-level checksums and versioned metadata binding an artifact together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub schema_version: String,
    pub artifact_version: String,
    pub build_timestamp: DateTime<Utc>,
    pub total_docs: u64,
    pub total_chunks: u64,
    pub index_type: String,
    pub compression: String,
    pub checksums: BTreeMap<String, String>,
}

impl Manifest {
    /// Compute a manifest for `artifact_dir`, hashing every file in
    /// [`ARTIFACT_FILES`] that exists.
    pub fn compute(
        artifact_dir: &Path,
        total_docs: u64,
        total_chunks: u64,
        index_type: impl Into<String>,
        compression: impl Into<String>,
        schema_version: impl Into<String>,
        artifact_version: impl Into<String>,
        built_at: DateTime<Utc>,
    ) -> Result<Self, StrataError> {
        let mut checksums = BTreeMap::new();
        for filename in ARTIFACT_FILES {
            let path = artifact_dir.join(filename);
            if path.exists() {
                checksums.insert(filename.to_string(), sha256_file(&path)?);
            }
        }

        Ok(Self {
            schema_version: schema_version.into(),
            artifact_version: artifact_version.into(),
            build_timestamp: built_at,
            total_docs,
            total_chunks,
            index_type: index_type.into(),
            compression: compression.into(),
            checksums,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), StrataError> {
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, StrataError> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Verify every required file exists and re-hashes to its stored digest.
    /// Aborts on the first mismatch or missing file.
    pub fn verify(&self, artifact_dir: &Path) -> Result<(), StrataError> {
        for filename in ARTIFACT_FILES {
            let path = artifact_dir.join(filename);
            if !path.exists() {
                return Err(StrataError::manifest_mismatch(format!(
                    "required artifact file missing: {filename}"
                )));
            }
        }

        for (filename, expected) in &self.checksums {
            let path = artifact_dir.join(filename);
            if !path.exists() {
                return Err(StrataError::manifest_mismatch(format!(
                    "file listed in manifest is missing: {filename}"
                )));
            }
            let actual = sha256_file(&path)?;
            if &actual != expected {
                return Err(StrataError::manifest_mismatch(format!(
                    "checksum mismatch for {filename}"
                )));
            }
        }

        Ok(())
    }
}

fn sha256_file(path: &Path) -> Result<String, StrataError> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
