//! Output module for reporting site search results
//!
//! This module handles:
//! - Summarizing a finished `SiteSearch`
//! - Generating the markdown report

mod markdown;
mod traits;

pub use markdown::{format_markdown_summary, generate_markdown_summary, MarkdownWriter};
pub use traits::{FoundMatch, KeyMatches, OutputError, OutputResult, SearchSummary, SummaryWriter};
