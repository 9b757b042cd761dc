//! Markdown summary generation
//!
//! This module generates a human-readable markdown report of a site search:
//! the resolved site, crawl counters, matches per search key with the page
//! they were last found on, and the external sites linked to.

use crate::output::traits::{OutputError, OutputResult, SearchSummary, SummaryWriter};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Generates a markdown summary of a site search
///
/// # Arguments
///
/// * `summary` - The search summary data
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(summary: &SearchSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path).map_err(|e| {
        OutputError::Write(format!("cannot create {}: {}", output_path.display(), e))
    })?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a search summary as markdown
pub fn format_markdown_summary(summary: &SearchSummary) -> String {
    let mut md = String::new();

    // Title
    md.push_str(&format!("# Site Search: {}\n\n", summary.target));

    // Site
    md.push_str("## Site\n\n");
    md.push_str(&format!("- **URL**: {}\n", summary.url));
    let exists = match summary.exists {
        Some(true) => "yes",
        Some(false) => "no",
        None => "not checked",
    };
    md.push_str(&format!("- **Exists**: {}\n", exists));
    md.push_str(&format!(
        "- **Processed**: {}\n",
        summary.processed_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(hash) = &summary.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    // Crawl counters
    md.push_str("## Crawl Statistics\n\n");
    md.push_str("| Counter | Value |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!(
        "| Pages Visited | {} |\n",
        summary.stats.pages_visited
    ));
    md.push_str(&format!("| Pages Failed | {} |\n", summary.stats.pages_failed));
    md.push_str(&format!(
        "| Frames Followed | {} |\n",
        summary.stats.frames_followed
    ));
    md.push_str(&format!(
        "| Links Followed | {} |\n",
        summary.stats.hrefs_followed
    ));
    md.push_str(&format!("| Matches | {} |\n\n", summary.total_matches()));

    // Matches
    md.push_str("## Matches\n\n");
    for key_matches in &summary.matches {
        md.push_str(&format!("### {}\n\n", key_matches.key));
        if key_matches.found.is_empty() {
            md.push_str("No matches.\n\n");
            continue;
        }

        md.push_str("| Match | Count | Last Seen |\n");
        md.push_str("|-------|-------|-----------|\n");
        for found in &key_matches.found {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                found.value,
                found.count,
                found.url.as_deref().unwrap_or("-")
            ));
        }
        md.push('\n');
    }

    // Followed links
    if !summary.links_followed.is_empty() {
        md.push_str("## Links Followed\n\n");
        for (url, clicks) in &summary.links_followed {
            md.push_str(&format!("- {} ({})\n", url, clicks));
        }
        md.push('\n');
    }

    // External links
    if !summary.external_links.is_empty() {
        md.push_str("## External Links\n\n");
        md.push_str(&format!("Total: {}\n\n", summary.external_links.len()));
        for host in &summary.external_links {
            md.push_str(&format!("- {}\n", host));
        }
        md.push('\n');
    }

    md
}

/// Writes the markdown report to a fixed path
#[derive(Debug, Clone)]
pub struct MarkdownWriter {
    path: PathBuf,
}

impl MarkdownWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SummaryWriter for MarkdownWriter {
    fn write_summary(&self, summary: &SearchSummary) -> OutputResult<()> {
        generate_markdown_summary(summary, &self.path)
    }
}
