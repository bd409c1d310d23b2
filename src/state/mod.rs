//! State module for crawl lifecycle tracking
//!
//! This module provides the crawl status state machine and the finding
//! records a completed crawl carries.
//!
//! # Components
//!
//! - `CrawlStatus`: Lifecycle of a single crawl record (pending, crawling, completed, failed)
//! - `BrokenLink`, `PermanentRedirect`, `SeoIssue`: Findings produced by classification

mod crawl_status;
mod findings;

// Re-export main types
pub use crawl_status::CrawlStatus;
pub use findings::{BrokenLink, Finding, Findings, PermanentRedirect, SeoIssue, SeoIssueType};
