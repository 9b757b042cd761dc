//! Disk cache for memoizing fetched pages
//!
//! This module handles:
//! - Deriving a file name from a function name and its arguments
//! - Reading and writing opaque blobs through the `BlobStore` trait
//! - Deciding whether a fresh result may be written (directory size budget)
//! - Wrapping a page source so repeated fetches are served from disk

mod fetcher;
mod memo;
mod store;

pub use fetcher::{CachedFetcher, FETCH_FUNCTION_NAME};
pub use memo::DiskCache;
pub use store::{BlobStore, DiskBlobStore};

use thiserror::Error;

/// Errors that can occur while reading or writing cache entries
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache encoding error: {0}")]
    Encode(#[from] bincode::Error),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Characters that never survive into a cache file name
const SPECIAL_CHARS: &[char] = &['"', '\'', '(', ')', ':', ',', '.', '&', '%', '#', '$', ';'];

/// Extension of every cache file
const CACHE_EXTENSION: &str = ".bin";

/// Creates a cache file name from a function name and its arguments
///
/// The arguments are rendered as a tuple (`('a',)`, `('a', 'b')`) after the
/// function name. Slashes, quotes, brackets, punctuation and whitespace become
/// underscores, runs of underscores collapse into one and `.bin` is appended.
///
/// # Examples
///
/// ```
/// use cbs_scrape::cache::make_cache_file_name;
///
/// assert_eq!(
///     make_cache_file_name("get_page_from_url_", &["https://www.example.com"]),
///     "get_page_from_url_https_www_example_com_.bin"
/// );
/// ```
pub fn make_cache_file_name<S: AsRef<str>>(function_name: &str, args: &[S]) -> String {
    let rendered_args = args
        .iter()
        .map(|arg| format!("'{}'", arg.as_ref()))
        .collect::<Vec<_>>();

    let tuple = match rendered_args.len() {
        1 => format!("({},)", rendered_args[0]),
        _ => format!("({})", rendered_args.join(", ")),
    };

    let mut file_name = String::with_capacity(function_name.len() + tuple.len());
    for c in function_name.chars().chain(tuple.chars()) {
        let c = if c == '/' || c.is_whitespace() || SPECIAL_CHARS.contains(&c) {
            '_'
        } else {
            c
        };

        if c == '_' && file_name.ends_with('_') {
            continue;
        }
        file_name.push(c);
    }

    file_name.push_str(CACHE_EXTENSION);
    file_name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_file_name_single_arg() {
        assert_eq!(
            make_cache_file_name("get_page_from_url", &["https://www.example.com/about"]),
            "get_page_from_url_https_www_example_com_about_.bin"
        );
    }

    #[test]
    fn test_cache_file_name_multiple_args() {
        assert_eq!(
            make_cache_file_name("lookup", &["a b", "c;d"]),
            "lookup_a_b_c_d_.bin"
        );
    }

    #[test]
    fn test_cache_file_name_no_args() {
        let empty: [&str; 0] = [];
        assert_eq!(make_cache_file_name("lookup", &empty), "lookup_.bin");
    }

    #[test]
    fn test_cache_file_name_is_deterministic() {
        let a = make_cache_file_name("f", &["http://x.test/?q=1&r=%20"]);
        let b = make_cache_file_name("f", &["http://x.test/?q=1&r=%20"]);
        assert_eq!(a, b);
        assert!(!a.contains('/'));
        assert!(!a.contains("__"));
    }
}
