//! Binary storage backend.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use crate::error::{CollectorError, CollectorResult};

/// Byte-level persistence used by the checkpoint store.
///
/// Every failure is reported as `CollectorError::StorageIoFailure` carrying
/// the path involved.
pub trait BinaryStorage: Send {
    /// Writes `bytes` to `path`, replacing any previous content.
    fn save(&self, path: &Path, bytes: &[u8]) -> CollectorResult<()>;

    /// Fills `bytes` from `path`; the file must hold exactly `bytes.len()` bytes.
    fn load(&self, path: &Path, bytes: &mut [u8]) -> CollectorResult<()>;

    /// Reads the whole file at `path`.
    fn load_to_end(&self, path: &Path) -> CollectorResult<Vec<u8>>;

    /// Removes `path`; a missing file is not an error.
    fn remove(&self, path: &Path) -> CollectorResult<()>;
}

/// [`BinaryStorage`] over the local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileStorage;

impl BinaryStorage for FileStorage {
    fn save(&self, path: &Path, bytes: &[u8]) -> CollectorResult<()> {
        let mut file = File::create(path).map_err(|e| CollectorError::storage(path, e))?;
        file.write_all(bytes)
            .and_then(|_| file.flush())
            .map_err(|e| CollectorError::storage(path, e))
    }

    fn load(&self, path: &Path, bytes: &mut [u8]) -> CollectorResult<()> {
        let mut file = File::open(path).map_err(|e| CollectorError::storage(path, e))?;
        let len = file
            .metadata()
            .map_err(|e| CollectorError::storage(path, e))?
            .len();
        if len != bytes.len() as u64 {
            return Err(CollectorError::storage(
                path,
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("file holds {} bytes, expected {}", len, bytes.len()),
                ),
            ));
        }
        file.read_exact(bytes)
            .map_err(|e| CollectorError::storage(path, e))
    }

    fn load_to_end(&self, path: &Path) -> CollectorResult<Vec<u8>> {
        std::fs::read(path).map_err(|e| CollectorError::storage(path, e))
    }

    fn remove(&self, path: &Path) -> CollectorResult<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CollectorError::storage(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_then_load_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunk_0.bin");
        FileStorage.save(&path, &[1, 2, 3, 4]).unwrap();

        let mut buf = [0u8; 4];
        FileStorage.load(&path, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
        assert_eq!(FileStorage.load_to_end(&path).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_load_size_mismatch_is_storage_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunk_1.bin");
        FileStorage.save(&path, &[0u8; 3]).unwrap();

        let mut buf = [0u8; 4];
        match FileStorage.load(&path, &mut buf) {
            Err(CollectorError::StorageIoFailure { path: p, source }) => {
                assert_eq!(p, path);
                assert_eq!(source.kind(), io::ErrorKind::InvalidData);
            }
            other => panic!("Expected StorageIoFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut buf = [0u8; 1];
        let result = FileStorage.load(&dir.path().join("absent.bin"), &mut buf);
        assert!(matches!(
            result,
            Err(CollectorError::StorageIoFailure { .. })
        ));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.rtmq");
        FileStorage.save(&path, b"x").unwrap();

        FileStorage.remove(&path).unwrap();
        assert!(!path.exists());
        FileStorage.remove(&path).unwrap();
    }
}
