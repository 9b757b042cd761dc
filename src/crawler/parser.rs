//! HTML parser adapter
//!
//! This module turns page text into an owned `ParsedPage` holding:
//! - The page title
//! - Every non-blank text node (searched by the patterns)
//! - The `src` of every `<frame>`
//! - The `href` of every `<a>`
//!
//! The parsed document itself is dropped before returning, so a
//! `ParsedPage` can be held across awaits.

use crate::search::find_matches;
use regex::Regex;
use scraper::{Html, Selector};

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Text nodes in document order
    pub texts: Vec<String>,

    /// Frame sources as written in the page
    pub frames: Vec<String>,

    /// Anchor hrefs as written in the page
    pub hrefs: Vec<String>,
}

impl ParsedPage {
    /// Runs `regex` against every text node, in document order
    pub fn find_patterns(&self, regex: &Regex) -> Vec<String> {
        self.texts
            .iter()
            .flat_map(|text| find_matches(regex, text))
            .collect()
    }
}

/// Parses HTML content into a `ParsedPage`
///
/// # Example
///
/// ```
/// use cbs_scrape::crawler::parse_html;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let parsed = parse_html(html);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.hrefs, vec!["/page"]);
/// ```
pub fn parse_html(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        texts: extract_texts(&document),
        frames: extract_attribute(&document, "frame[src]", "src"),
        hrefs: extract_attribute(&document, "a[href]", "href"),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_texts(document: &Html) -> Vec<String> {
    document
        .root_element()
        .text()
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Collects one attribute of every element matching `selector`
fn extract_attribute(document: &Html, selector: &str, attribute: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr(attribute))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}
