use super::{make_cache_file_name, BlobStore, CacheResult, DiskBlobStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use tracing::{debug, warn};

/// Memoizing cache keyed by function name and arguments
///
/// A lookup that finds a decodable blob returns it without running the
/// computation. Otherwise the computation runs and its successful result is
/// written, subject to the size budget:
///
/// - `None`: always write
/// - `Some(0)`: never write (existing entries are still served)
/// - `Some(n)`: write only while the stored blobs total less than `n` bytes
#[derive(Debug, Clone)]
pub struct DiskCache<S = DiskBlobStore> {
    store: S,
    max_size: Option<u64>,
}

impl<S: BlobStore> DiskCache<S> {
    pub fn new(store: S, max_size: Option<u64>) -> Self {
        Self { store, max_size }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn max_size(&self) -> Option<u64> {
        self.max_size
    }

    /// Whether a freshly computed result may be written right now
    pub fn admits_new_entries(&self) -> bool {
        match self.max_size {
            None => true,
            Some(0) => false,
            Some(limit) => match self.store.total_size() {
                Ok(size) => size < limit,
                Err(e) => {
                    warn!("Could not measure cache size, skipping write: {}", e);
                    false
                }
            },
        }
    }

    /// Reads and decodes the entry stored under `key`
    ///
    /// Any I/O or decoding failure is a miss.
    pub fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let blob = match self.store.read(key) {
            Ok(blob) => blob,
            Err(e) => {
                debug!("Cache miss for {}: {}", key, e);
                return None;
            }
        };

        match bincode::deserialize(&blob) {
            Ok(value) => {
                debug!("Retrieved from cache {}", key);
                Some(value)
            }
            Err(e) => {
                debug!("Unreadable cache entry {}: {}", key, e);
                None
            }
        }
    }

    /// Encodes and writes `value` under `key`
    pub fn persist<T: Serialize>(&self, key: &str, value: &T) -> CacheResult<()> {
        let blob = bincode::serialize(value)?;
        self.store.write(key, &blob)?;
        debug!("Dumped to cache {}", key);
        Ok(())
    }

    /// Returns the cached result of `function_name(args)` or computes it
    ///
    /// Errors of the computation are passed through and never cached. Write
    /// failures are logged; the computed value is returned regardless.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        function_name: &str,
        args: &[&str],
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = make_cache_file_name(function_name, args);

        if let Some(value) = self.lookup(&key) {
            return Ok(value);
        }

        let value = compute().await?;

        if self.admits_new_entries() {
            if let Err(e) = self.persist(&key, &value) {
                warn!("Cache write error for {}: {}", key, e);
            }
        } else {
            debug!("Cache budget reached, not writing {}", key);
        }

        Ok(value)
    }
}
