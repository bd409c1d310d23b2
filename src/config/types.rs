use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Site-Auditor
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub reports: ReportsConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Page-visit budget for a single crawl
    #[serde(rename = "max-pages")]
    pub max_pages: usize,

    /// Maximum number of fetches in flight at once
    #[serde(rename = "max-concurrent-fetches")]
    pub max_concurrent_fetches: usize,

    /// Per-request timeout in seconds
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Age after which a non-terminal crawl is considered abandoned (seconds)
    #[serde(rename = "stale-crawl-grace-secs", default = "default_stale_grace")]
    pub stale_crawl_grace_secs: u64,
}

impl CrawlerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn stale_crawl_grace(&self) -> Duration {
        Duration::from_secs(self.stale_crawl_grace_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 200,
            max_concurrent_fetches: 8,
            request_timeout_secs: default_request_timeout(),
            stale_crawl_grace_secs: default_stale_grace(),
        }
    }
}

fn default_request_timeout() -> u64 {
    30
}

fn default_stale_grace() -> u64 {
    3600
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Report and dashboard configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    /// Number of most recent crawls the dashboard aggregates over
    #[serde(rename = "recent-crawl-limit")]
    pub recent_crawl_limit: usize,

    /// Number of crawls listed in the crawl history
    #[serde(rename = "history-limit")]
    pub history_limit: usize,

    /// Number of websites shown in the health overview
    #[serde(rename = "health-website-limit")]
    pub health_website_limit: usize,

    /// Poll interval for watching active crawls (seconds)
    #[serde(rename = "refresh-interval-secs")]
    pub refresh_interval_secs: u64,

    /// Path to the markdown report file
    #[serde(rename = "summary-path")]
    pub summary_path: String,
}

impl ReportsConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            recent_crawl_limit: 50,
            history_limit: 20,
            health_website_limit: 3,
            refresh_interval_secs: 5,
            summary_path: "./site-report.md".to_string(),
        }
    }
}
