//! Output module for presenting audit results
//!
//! This module handles:
//! - Printing the dashboard and the selected report to the terminal
//! - Exporting the selected report as a markdown file

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_report, write_markdown_report};
pub use stats::{
    print_active_crawls, print_dashboard, print_report, render_active_crawls, render_dashboard,
    render_report,
};

use thiserror::Error;

/// Errors that can occur while producing output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Nothing to export: no completed crawl is selected")]
    EmptySelection,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Formats a timestamp the way all output shows it
pub(crate) fn format_date(when: &chrono::DateTime<chrono::Utc>) -> String {
    when.format("%B %-d, %Y at %H:%M UTC").to_string()
}
