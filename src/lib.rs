//! Site-Auditor: a website health crawler
//!
//! This crate crawls a website breadth-first, reports broken links (404),
//! permanent redirects (301/308) and SEO defects, and keeps an append-only
//! history of crawls that reports are built from.

pub mod config;
pub mod crawler;
pub mod output;
pub mod report;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Site-Auditor operations
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid status transition for crawl {crawl_id}: {from} -> {to}")]
    InvalidTransition {
        crawl_id: i64,
        from: state::CrawlStatus,
        to: state::CrawlStatus,
    },

    #[error("Crawl {crawl_id} was already settled as {status}")]
    CrawlSettled {
        crawl_id: i64,
        status: state::CrawlStatus,
    },

    #[error("Traversal aborted unexpectedly: {0}")]
    TraversalFault(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Transport failures reported by a page fetcher
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Host unreachable for {url}: {message}")]
    Unreachable { url: String, message: String },

    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },
}

impl FetchError {
    /// The URL the failed request was made for
    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url } | Self::Unreachable { url, .. } | Self::Transport { url, .. } => {
                url
            }
        }
    }
}

/// Result type alias for Site-Auditor operations
pub type Result<T> = std::result::Result<T, AuditError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlOrchestrator, CrawlRequest, HttpFetcher, PageFetcher};
pub use state::{CrawlStatus, Findings};
pub use storage::{Crawl, SqliteStorage, Storage, Website};
pub use url::{extract_host, is_same_site, normalize_url};
