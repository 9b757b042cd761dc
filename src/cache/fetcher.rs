use super::{BlobStore, DiskBlobStore, DiskCache};
use crate::crawler::{FetchError, Page, PageSource};
use async_trait::async_trait;
use tracing::debug;

/// Function name used in the cache keys of fetched pages
pub const FETCH_FUNCTION_NAME: &str = "get_page_from_url";

/// A `PageSource` memoized on disk
///
/// Pages are keyed by URL only. Failed fetches are never stored, so an
/// unreachable page is retried on the next run.
pub struct CachedFetcher<P, S = DiskBlobStore> {
    inner: P,
    cache: DiskCache<S>,
}

impl<P: PageSource, S: BlobStore> CachedFetcher<P, S> {
    pub fn new(inner: P, cache: DiskCache<S>) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &DiskCache<S> {
        &self.cache
    }

    /// Fetches `url`, bypassing the cache when `skip_cache` is set
    pub async fn fetch_with(&self, url: &str, skip_cache: bool) -> Result<Page, FetchError> {
        if skip_cache {
            debug!("Skipping cache for {}", url);
            return self.inner.fetch(url).await;
        }

        self.cache
            .get_or_compute(FETCH_FUNCTION_NAME, &[url], || self.inner.fetch(url))
            .await
    }
}

#[async_trait]
impl<P: PageSource, S: BlobStore> PageSource for CachedFetcher<P, S> {
    async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        self.fetch_with(url, false).await
    }
}
