//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlPhase`: the phase a crawl is in (resolving, visiting, following, done)
//! - `CrawlSession`: counters, branch quota, link table and matches of one crawl
//! - `BranchCounter`: number of links classified per first path section

mod phase;
mod session;

// Re-export main types
pub use phase::CrawlPhase;
pub use session::{BranchCounter, CrawlSession, CrawlStats};
