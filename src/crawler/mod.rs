//! Crawler module for searching one web site
//!
//! This module contains the core crawling logic, including:
//! - The HTTP session with retry logic
//! - Scheme resolution of the target
//! - Page fetching and HTML parsing
//! - Link classification and the ranked link table
//! - Overall crawl coordination (`SiteSearch`)

mod classifier;
mod coordinator;
mod fetcher;
mod links;
mod parser;
mod resolver;
mod session;

pub use classifier::{CrawlTarget, LinkClassifier, LinkVerdict, Rejection};
pub use coordinator::{CrawlOptions, SiteSearch};
pub use fetcher::{
    classify_error, fetch_page, get_page_from_url, FetchError, FetchOptions, HttpPageSource, Page,
    PageSource,
};
pub use links::{HrefRecord, HrefTable};
pub use parser::{parse_html, ParsedPage};
pub use resolver::{resolve_scheme, ResolvedUrl};
pub use session::{build_http_client, HttpSession, RetryPolicy};
