//! Configuration module for cbs-scrape
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use cbs_scrape::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Searching {} with max depth {}", config.target.url, config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    clamped_duration, CacheConfig, Config, CrawlerConfig, HttpConfig, OutputConfig, SearchEntry,
    TargetConfig, DEFAULT_USER_AGENT, MAX_BACKOFF_FACTOR, MAX_TIMEOUT_SECS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
