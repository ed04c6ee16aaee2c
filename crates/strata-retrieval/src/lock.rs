use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

use strata_core::StrataError;

/// Advisory lock on an artifact directory, held for the duration of a build.
///
/// Backed by a sentinel `.lock` file created with a create-new/exclusive
/// open; removed on drop. Catches concurrent-writer user error, not a
/// substitute for real mutual exclusion across machines.
pub struct ArtifactLock {
    path: PathBuf,
}

impl ArtifactLock {
    pub fn acquire(artifact_dir: &Path) -> Result<Self, StrataError> {
        let path = artifact_dir.join(".lock");
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Self { path }),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(StrataError::Io(
                io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("artifact directory is locked by another build: {}", path.display()),
                ),
            )),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for ArtifactLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_lock_fails_while_first_is_held() {
        let dir = tempfile::tempdir().unwrap();
        let lock = ArtifactLock::acquire(dir.path()).unwrap();
        assert!(ArtifactLock::acquire(dir.path()).is_err());
        drop(lock);
        assert!(ArtifactLock::acquire(dir.path()).is_ok());
    }
}
