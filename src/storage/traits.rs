//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{
    Crawl, CrawlId, CrawlUpdate, NewCrawl, NewWebsite, Website, WebsiteId, WebsiteUpdate,
};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Website not found: {0}")]
    WebsiteNotFound(WebsiteId),

    #[error("Crawl not found: {0}")]
    CrawlNotFound(CrawlId),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Lists are always ordered by `created_date` descending (most recent
/// first), with the record id as tie-breaker so ordering is total.
pub trait Storage {
    // ===== Websites =====

    /// Registers a new website; fails if the URL is already registered
    fn create_website(&mut self, website: &NewWebsite) -> StorageResult<Website>;

    /// Gets a website by ID
    fn get_website(&self, id: WebsiteId) -> StorageResult<Website>;

    /// Looks a website up by its exact (normalized) URL
    fn find_website_by_url(&self, url: &str) -> StorageResult<Option<Website>>;

    /// Applies a partial update and returns the updated record
    fn update_website(&mut self, id: WebsiteId, update: &WebsiteUpdate) -> StorageResult<Website>;

    /// Lists websites, most recently created first
    fn list_websites(&self, limit: Option<usize>) -> StorageResult<Vec<Website>>;

    // ===== Crawls =====

    /// Opens a new crawl record
    fn create_crawl(&mut self, crawl: &NewCrawl) -> StorageResult<Crawl>;

    /// Gets a crawl by ID
    fn get_crawl(&self, id: CrawlId) -> StorageResult<Crawl>;

    /// Applies a partial update and returns the updated record
    fn update_crawl(&mut self, id: CrawlId, update: &CrawlUpdate) -> StorageResult<Crawl>;

    /// Applies a partial update only while the crawl is `pending` or `crawling`
    ///
    /// The status check and the write are a single step, so a crawl that
    /// another writer already settled is never moved out of its terminal
    /// status. Returns `Ok(None)` when the crawl was already terminal.
    fn advance_crawl(&mut self, id: CrawlId, update: &CrawlUpdate)
        -> StorageResult<Option<Crawl>>;

    /// Lists crawls across all websites, most recent first
    fn list_crawls(&self, limit: Option<usize>) -> StorageResult<Vec<Crawl>>;

    /// Lists crawls of one website, most recent first
    fn list_crawls_for_website(
        &self,
        website_id: WebsiteId,
        limit: Option<usize>,
    ) -> StorageResult<Vec<Crawl>>;
}
