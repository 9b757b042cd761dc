//! Search module for the patterns run against every visited page
//!
//! # Components
//!
//! - `SearchSpec`: ordered name → compiled regex mapping supplied per crawl
//! - `RankKeywords`: case-insensitive keywords that push links to the front
//! - `MatchRecord`: accumulated matches plus the match → discovery-URL table
//! - `patterns`: predefined Dutch registration patterns (postcode, BTW, KvK)

mod matches;
pub mod patterns;
mod spec;

pub use matches::MatchRecord;
pub use patterns::{is_postcode, standard_postcode, Preset};
pub use spec::{find_matches, RankKeywords, SearchSpec};
