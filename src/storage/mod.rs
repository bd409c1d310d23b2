//! Storage module for persisting websites and crawls
//!
//! This module handles all database operations for the auditor, including:
//! - SQLite database initialization and schema management
//! - Website registration and lookup by normalized URL
//! - Append-only crawl history with status, counters and findings
//! - Recency-ordered listing for dashboards and report selection

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::{CrawlStatus, Findings};
use chrono::{DateTime, Utc};

/// Identifier of a website record
pub type WebsiteId = i64;

/// Identifier of a crawl record
pub type CrawlId = i64;

/// A registered website
#[derive(Debug, Clone, PartialEq)]
pub struct Website {
    pub id: WebsiteId,
    /// Normalized URL, unique across websites
    pub url: String,
    pub name: String,
    /// Desired crawl cadence, stored as given
    pub schedule: String,
    /// Mirrors the status of the most recent crawl
    pub last_crawl_status: CrawlStatus,
    /// When the most recent crawl completed
    pub last_crawled_date: Option<DateTime<Utc>>,
    pub created_date: DateTime<Utc>,
}

/// A single crawl of a website
#[derive(Debug, Clone, PartialEq)]
pub struct Crawl {
    pub id: CrawlId,
    pub website_id: WebsiteId,
    /// Snapshot of the website URL at crawl time
    pub website_url: String,
    pub status: CrawlStatus,
    pub pages_found: u64,
    pub pages_crawled: u64,
    pub findings: Findings,
    pub created_date: DateTime<Utc>,
}

/// Fields required to register a website
#[derive(Debug, Clone)]
pub struct NewWebsite {
    pub url: String,
    pub name: String,
    pub schedule: String,
    pub last_crawl_status: CrawlStatus,
}

/// Fields required to open a crawl record
#[derive(Debug, Clone)]
pub struct NewCrawl {
    pub website_id: WebsiteId,
    pub website_url: String,
    pub status: CrawlStatus,
}

/// Partial update of a website; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct WebsiteUpdate {
    pub name: Option<String>,
    pub schedule: Option<String>,
    pub last_crawl_status: Option<CrawlStatus>,
    pub last_crawled_date: Option<DateTime<Utc>>,
}

impl WebsiteUpdate {
    pub fn status(status: CrawlStatus) -> Self {
        Self {
            last_crawl_status: Some(status),
            ..Self::default()
        }
    }

    pub fn completed_at(when: DateTime<Utc>) -> Self {
        Self {
            last_crawl_status: Some(CrawlStatus::Completed),
            last_crawled_date: Some(when),
            ..Self::default()
        }
    }
}

/// Partial update of a crawl; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct CrawlUpdate {
    pub status: Option<CrawlStatus>,
    pub pages_found: Option<u64>,
    pub pages_crawled: Option<u64>,
    pub findings: Option<Findings>,
}

impl CrawlUpdate {
    pub fn status(status: CrawlStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn progress(pages_found: u64, pages_crawled: u64) -> Self {
        Self {
            pages_found: Some(pages_found),
            pages_crawled: Some(pages_crawled),
            ..Self::default()
        }
    }
}
