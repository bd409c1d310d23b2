//! Crawler module for auditing a single website
//!
//! This module contains the crawl engine, including:
//! - Page fetching behind the `PageFetcher` capability
//! - HTML parsing of titles, descriptions and links
//! - Issue classification (broken links, permanent redirects, SEO)
//! - Bounded-concurrency breadth-first traversal
//! - Crawl orchestration and stale-crawl reconciliation

mod classifier;
mod fetcher;
mod orchestrator;
mod parser;
mod recovery;
mod traversal;

#[cfg(test)]
pub(crate) mod testing;

pub use classifier::{classify, LinkOrigin, TitleRegistry};
pub use fetcher::{build_http_client, FetchedPage, HttpFetcher, PageFetcher};
pub use orchestrator::{
    CrawlEvent, CrawlOrchestrator, CrawlOutcome, CrawlRequest, DEFAULT_SCHEDULE,
};
pub use parser::{parse_html, OutboundLink, ParsedPage};
pub use recovery::reconcile_stale_crawls;
pub use traversal::{CrawlProgress, CrawlTraversal, TraversalReport};
