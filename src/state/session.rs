use crate::config::CrawlerConfig;
use crate::crawler::HrefTable;
use crate::search::MatchRecord;
use crate::state::CrawlPhase;
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// Number of classified links per first path section of the site
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchCounter {
    counts: HashMap<String, usize>,
}

impl BranchCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one more link in `branch` and returns the new count
    pub fn increment(&mut self, branch: &str) -> usize {
        let count = self.counts.entry(branch.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn get(&self, branch: &str) -> usize {
        self.counts.get(branch).copied().unwrap_or(0)
    }

    /// Number of distinct branches seen
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Counters reported after a crawl
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Pages that answered 200 and were searched
    pub pages_visited: usize,
    /// Pages that could not be fetched or did not answer 200
    pub pages_failed: usize,
    /// Frame pages recursed into
    pub frames_followed: usize,
    /// Links recursed into
    pub hrefs_followed: usize,
}

/// Mutable state of one crawl
///
/// Owned by a single crawl and passed by `&mut` through the recursive visit,
/// so every budget counter lives in one place.
#[derive(Debug)]
pub struct CrawlSession {
    phase: CrawlPhase,

    /// Frames encountered so far (including those over budget)
    pub frame_counter: usize,

    /// Links taken from the table so far (including those over budget)
    pub href_counter: usize,

    pub branch_count: BranchCounter,

    /// Link table, built from the first page whose links are followed
    pub href_table: Option<HrefTable>,

    /// Hosts of external links, in discovery order
    pub external_links: Vec<String>,

    followed_urls: HashSet<String>,

    /// Set once a stop key matched; ends link following
    pub stop: bool,

    pub matches: MatchRecord,

    /// True once any page answered 200
    pub page_found: bool,

    pub stats: CrawlStats,
}

impl CrawlSession {
    /// Creates the state of a crawl searching for the given keys
    pub fn new<I, S>(search_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            phase: CrawlPhase::Initializing,
            frame_counter: 0,
            href_counter: 0,
            branch_count: BranchCounter::new(),
            href_table: None,
            external_links: Vec::new(),
            followed_urls: HashSet::new(),
            stop: false,
            matches: MatchRecord::new(search_keys),
            page_found: false,
            stats: CrawlStats::default(),
        }
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    /// Moves to `next` if the transition is allowed
    pub fn enter(&mut self, next: CrawlPhase) -> bool {
        if !self.phase.can_transition_to(next) {
            debug!("Ignoring phase change {} -> {}", self.phase, next);
            return false;
        }
        trace!("Crawl phase {} -> {}", self.phase, next);
        self.phase = next;
        true
    }

    /// Counts one frame; returns false once the frame budget is exceeded
    pub fn next_frame(&mut self, config: &CrawlerConfig) -> bool {
        self.frame_counter += 1;
        self.frame_counter <= config.max_frames
    }

    /// Counts one link; returns false once the link budget is exceeded
    pub fn next_href(&mut self, config: &CrawlerConfig) -> bool {
        self.href_counter += 1;
        self.href_counter <= config.max_hrefs
    }

    /// Records an external host unless already known
    pub fn add_external_link(&mut self, host: &str) -> bool {
        if self.is_external_link(host) {
            return false;
        }
        self.external_links.push(host.to_string());
        true
    }

    pub fn is_external_link(&self, host: &str) -> bool {
        self.external_links.iter().any(|known| known == host)
    }

    /// Marks `url` as followed; returns false if it already was
    pub fn mark_followed(&mut self, url: &str) -> bool {
        self.followed_urls.insert(url.to_string())
    }

    pub fn is_followed(&self, url: &str) -> bool {
        self.followed_urls.contains(url)
    }

    /// Sets the stop flag if any of `stop_keys` has a match
    ///
    /// Returns the first key that matched.
    pub fn check_stop<'k>(&mut self, stop_keys: &'k [String]) -> Option<&'k str> {
        let key = stop_keys.iter().find(|key| self.matches.has_any(key))?;
        self.stop = true;
        Some(key.as_str())
    }
}
