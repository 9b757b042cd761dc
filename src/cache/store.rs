use super::CacheResult;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Key-value store for opaque cache blobs
///
/// Implementations must be shareable across tasks. A missing key is reported
/// as an error; callers treat every read error as a cache miss.
pub trait BlobStore: Send + Sync {
    /// Reads the blob stored under `key`
    fn read(&self, key: &str) -> CacheResult<Vec<u8>>;

    /// Stores `blob` under `key`, replacing any previous blob
    fn write(&self, key: &str, blob: &[u8]) -> CacheResult<()>;

    /// Total size in bytes of all stored blobs
    fn total_size(&self) -> CacheResult<u64>;
}

/// Blob store keeping one file per key in a single directory
///
/// The directory is created on the first write. Concurrent writers to the
/// same key race; the last one wins.
#[derive(Debug, Clone)]
pub struct DiskBlobStore {
    directory: PathBuf,
}

impl DiskBlobStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the file that holds `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.directory.join(key)
    }
}

impl BlobStore for DiskBlobStore {
    fn read(&self, key: &str) -> CacheResult<Vec<u8>> {
        Ok(fs::read(self.path_for(key))?)
    }

    fn write(&self, key: &str, blob: &[u8]) -> CacheResult<()> {
        fs::create_dir_all(&self.directory)?;
        fs::write(self.path_for(key), blob)?;
        Ok(())
    }

    fn total_size(&self) -> CacheResult<u64> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut total = 0;
        for entry in entries {
            let metadata = entry?.metadata()?;
            if metadata.is_file() {
                total += metadata.len();
            }
        }

        Ok(total)
    }
}
