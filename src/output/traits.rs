//! Output handler traits and types
//!
//! This module defines the summary of a finished site search and the trait
//! implemented by the report writers.

use crate::crawler::SiteSearch;
use crate::state::CrawlStats;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// One distinct match of a search key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundMatch {
    pub value: String,
    /// Number of times the value was found
    pub count: usize,
    /// Last page on which the value was found
    pub url: Option<String>,
}

/// Matches of one search key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMatches {
    pub key: String,
    pub found: Vec<FoundMatch>,
}

impl KeyMatches {
    pub fn total(&self) -> usize {
        self.found.iter().map(|m| m.count).sum()
    }
}

/// Summary of a finished site search
#[derive(Debug, Clone)]
pub struct SearchSummary {
    pub target: String,
    /// Resolved URL, or the target when it was never resolved
    pub url: String,
    pub exists: Option<bool>,
    pub processed_at: DateTime<Utc>,
    pub config_hash: Option<String>,
    pub stats: CrawlStats,
    /// Per search key, in search order
    pub matches: Vec<KeyMatches>,
    pub external_links: Vec<String>,
    /// Followed links with their click counts, in visiting order
    pub links_followed: Vec<(String, u32)>,
}

impl SearchSummary {
    /// Collects the results of `search`
    pub fn from_search(search: &SiteSearch, config_hash: Option<String>) -> Self {
        let record = search.matches();

        let matches = record
            .iter()
            .map(|(key, values)| {
                let mut found: Vec<FoundMatch> = Vec::new();
                for value in values {
                    match found.iter_mut().find(|m| &m.value == value) {
                        Some(existing) => existing.count += 1,
                        None => found.push(FoundMatch {
                            value: value.clone(),
                            count: 1,
                            url: record.url_for(key, value).map(str::to_string),
                        }),
                    }
                }
                KeyMatches {
                    key: key.to_string(),
                    found,
                }
            })
            .collect();

        let links_followed = search
            .href_table()
            .map(|table| {
                table
                    .iter()
                    .filter(|record| record.clicks > 0)
                    .map(|record| (record.url.clone(), record.clicks))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            target: search.target().to_string(),
            url: search.url().to_string(),
            exists: search.exists(),
            processed_at: search.processed_at(),
            config_hash,
            stats: search.stats(),
            matches,
            external_links: search.external_links().to_vec(),
            links_followed,
        }
    }

    /// Total number of matches over all keys
    pub fn total_matches(&self) -> usize {
        self.matches.iter().map(KeyMatches::total).sum()
    }
}

/// Trait for report writers
pub trait SummaryWriter {
    /// Writes the report of one site search
    fn write_summary(&self, summary: &SearchSummary) -> OutputResult<()>;
}
