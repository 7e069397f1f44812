//! Run-scoped workspace directory.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{CollectorError, CollectorResult};

/// Directory exclusively owned by one collector.
///
/// Created as `<root>/run-<uuid>`; removed with everything in it on drop
/// unless `keep` is set.
#[derive(Debug)]
pub struct RunWorkspace {
    dir: PathBuf,
    keep: bool,
}

impl RunWorkspace {
    /// Creates a fresh run directory under `root`.
    ///
    /// # Errors
    ///
    /// Returns `CollectorError::StorageIoFailure` if `root` cannot be created
    /// or the run directory already exists.
    pub fn create(root: &Path, keep: bool) -> CollectorResult<Self> {
        std::fs::create_dir_all(root).map_err(|e| CollectorError::storage(root, e))?;

        let dir = root.join(format!("run-{}", Uuid::new_v4().simple()));
        std::fs::create_dir(&dir).map_err(|e| CollectorError::storage(&dir, e))?;
        debug!(path = %dir.display(), keep, "run workspace created");

        Ok(Self { dir, keep })
    }

    /// Run directory path.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// File holding raw chunk `chunk_index`.
    pub fn chunk_path(&self, chunk_index: usize) -> PathBuf {
        self.dir.join(format!("chunk_{}.bin", chunk_index))
    }

    /// File holding the compressed blob of global frame `frame`.
    pub fn frame_blob_path(&self, frame: usize) -> PathBuf {
        self.dir.join(format!("forward_pressure_{}.rtmq", frame))
    }
}

impl Drop for RunWorkspace {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => debug!(path = %self.dir.display(), "run workspace removed"),
            Err(e) => warn!(path = %self.dir.display(), error = %e, "cannot remove run workspace"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_unique_directories() {
        let root = tempfile::tempdir().unwrap();
        let a = RunWorkspace::create(root.path(), false).unwrap();
        let b = RunWorkspace::create(root.path(), false).unwrap();

        assert_ne!(a.path(), b.path());
        assert!(a.path().is_dir());
        assert!(a
            .path()
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("run-")));
    }

    #[test]
    fn test_file_naming() {
        let root = tempfile::tempdir().unwrap();
        let ws = RunWorkspace::create(root.path(), false).unwrap();

        assert!(ws.chunk_path(3).ends_with("chunk_3.bin"));
        assert!(ws.frame_blob_path(12).ends_with("forward_pressure_12.rtmq"));
    }

    #[test]
    fn test_drop_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let ws = RunWorkspace::create(root.path(), false).unwrap();
        let dir = ws.path().to_path_buf();
        std::fs::write(ws.chunk_path(0), b"data").unwrap();

        drop(ws);
        assert!(!dir.exists());
    }

    #[test]
    fn test_keep_survives_drop() {
        let root = tempfile::tempdir().unwrap();
        let ws = RunWorkspace::create(root.path(), true).unwrap();
        let dir = ws.path().to_path_buf();

        drop(ws);
        assert!(dir.is_dir());
    }

    #[test]
    fn test_creates_missing_root() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        let ws = RunWorkspace::create(&nested, false).unwrap();
        assert!(ws.path().starts_with(&nested));
    }
}
