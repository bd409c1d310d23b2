//! Markdown report generation
//!
//! This module renders the selected crawl report as a markdown document:
//! summary counts followed by one table per finding kind.

use crate::output::{format_date, OutputError, OutputResult};
use crate::report::{CrawlStats, Selection};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the selected report to `output_path`
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(OutputError::EmptySelection)` - No crawl is selected
/// * `Err(OutputError::Io)` - Failed to write the file
pub fn write_markdown_report(selection: &Selection<'_>, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_report(selection).ok_or(OutputError::EmptySelection)?;

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats the selected report as markdown; `None` when nothing is selected
pub fn format_markdown_report(selection: &Selection<'_>) -> Option<String> {
    let crawl = selection.crawl?;
    let stats = CrawlStats::of(crawl);
    let mut md = String::new();

    let name = selection
        .website
        .map(|w| w.name.as_str())
        .unwrap_or(crawl.website_url.as_str());
    md.push_str(&format!("# Website Report: {}\n\n", escape(name)));

    md.push_str("## Crawl Information\n\n");
    md.push_str(&format!("- **URL**: {}\n", crawl.website_url));
    md.push_str(&format!("- **Crawl ID**: {}\n", crawl.id));
    md.push_str(&format!("- **Date**: {}\n", format_date(&crawl.created_date)));
    md.push_str(&format!("- **Status**: {}\n", crawl.status));
    md.push_str(&format!("- **Pages Found**: {}\n", crawl.pages_found));
    md.push_str(&format!("- **Pages Crawled**: {}\n\n", crawl.pages_crawled));

    md.push_str("## Summary\n\n");
    md.push_str("| Issue | Count |\n");
    md.push_str("|-------|-------|\n");
    md.push_str(&format!("| 404 Errors | {} |\n", stats.errors_404));
    md.push_str(&format!("| 301 Redirects | {} |\n", stats.redirects_301));
    md.push_str(&format!("| SEO Issues | {} |\n\n", stats.seo_issues));

    if !crawl.findings.errors_404.is_empty() {
        md.push_str("## 404 Errors\n\n");
        md.push_str("| URL | Found On | Link Text |\n");
        md.push_str("|-----|----------|-----------|\n");
        for link in &crawl.findings.errors_404 {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                escape(&link.url),
                escape(&link.source_page),
                escape(&link.link_text)
            ));
        }
        md.push('\n');
    }

    if !crawl.findings.redirects_301.is_empty() {
        md.push_str("## 301 Redirects\n\n");
        md.push_str("| From | To | Found On |\n");
        md.push_str("|------|----|----------|\n");
        for redirect in &crawl.findings.redirects_301 {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                escape(&redirect.from_url),
                escape(&redirect.to_url),
                escape(&redirect.source_page)
            ));
        }
        md.push('\n');
    }

    if !crawl.findings.seo_issues.is_empty() {
        md.push_str("## SEO Issues\n\n");
        md.push_str("| URL | Issue | Description |\n");
        md.push_str("|-----|-------|-------------|\n");
        for issue in &crawl.findings.seo_issues {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                escape(&issue.url),
                issue.issue_type,
                escape(&issue.description)
            ));
        }
        md.push('\n');
    }

    md.push_str("---\n\n");
    md.push_str("*Generated by Site-Auditor*\n");

    Some(md)
}

/// Keeps table cells intact
fn escape(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
