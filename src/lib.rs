//! cbs-scrape: a cache-aware site search crawler
//!
//! This crate crawls a single web site depth-first, runs a set of named
//! regular-expression searches on every visited page and aggregates the
//! matches. Traversal is bounded by frame, link, depth and per-branch budgets,
//! link following is ranked by caller-supplied keywords, and a search can stop
//! early as soon as designated keys have matched. Pages can be memoized on disk.

pub mod cache;
pub mod config;
pub mod crawler;
pub mod output;
pub mod search;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for cbs-scrape operations
///
/// Network failures during a crawl are never surfaced through this type; they
/// are logged and the crawl continues. Only construction and I/O problems are.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Invalid search pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] cache::CacheError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid crawl options: {0}")]
    Validation(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid search pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),
}

/// Result type alias for cbs-scrape operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlOptions, SiteSearch};
pub use search::{MatchRecord, SearchSpec};
pub use state::CrawlPhase;
pub use url::{registrable_domain, strip_url_scheme, Scheme};
