//! Page fetching capability
//!
//! This module defines the `PageFetcher` boundary the traversal calls for
//! every discovered page, plus the reqwest-backed implementation:
//! - Building HTTP clients with proper user agent strings
//! - GET requests with redirects disabled so 301/308 are observed directly
//! - HTML metadata and link extraction for successful pages
//! - Transport error classification

use crate::config::UserAgentConfig;
use crate::crawler::parser::{parse_html, OutboundLink};
use crate::FetchError;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;
use url::Url;

/// Result of fetching one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedPage {
    /// HTTP status code
    pub status_code: u16,

    /// Absolute redirect target from the `Location` header, for 3xx responses
    pub redirect_target: Option<String>,

    /// Content-Type header value
    pub content_type: Option<String>,

    /// Page title, for HTML pages
    pub title: Option<String>,

    /// Meta description, for HTML pages
    pub description: Option<String>,

    /// Links found on the page, for successful HTML pages
    pub links: Vec<OutboundLink>,
}

impl FetchedPage {
    /// Returns true when the response is HTML (or did not say otherwise)
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("html"))
            .unwrap_or(true)
    }

    /// Returns true for a 3xx response
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status_code)
    }
}

/// Capability to fetch a single page
///
/// Implementations report HTTP outcomes (including 4xx/5xx) as a
/// `FetchedPage`; only transport failures are errors.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use site_auditor::config::UserAgentConfig;
/// use site_auditor::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "SiteAuditor".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10).min(timeout))
        .redirect(Policy::none()) // Redirects are findings, not something to follow blindly
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed page fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &UserAgentConfig, timeout: Duration) -> crate::Result<Self> {
        Ok(Self {
            client: build_http_client(config, timeout)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    /// Fetches a URL and classifies the response
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | 3xx | `FetchedPage` with `redirect_target` resolved from `Location` |
    /// | 200 + HTML | `FetchedPage` with title, description and links |
    /// | any other status | `FetchedPage` with just the status |
    /// | Timeout | `FetchError::Timeout` |
    /// | Connection refused / DNS | `FetchError::Unreachable` |
    /// | Body read failure | `FetchError::Transport` |
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut page = FetchedPage {
            status_code: status.as_u16(),
            content_type,
            ..FetchedPage::default()
        };

        if status.is_redirection() {
            page.redirect_target = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|location| url.join(location).ok())
                .map(|target| target.to_string());
            return Ok(page);
        }

        if status != StatusCode::OK || !page.is_html() {
            return Ok(page);
        }

        let final_url = response.url().clone();
        let body = response.text().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let parsed = parse_html(&body, &final_url);
        page.title = parsed.title;
        page.description = parsed.description;
        page.links = parsed.links;

        Ok(page)
    }
}

fn classify_error(url: &Url, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if e.is_connect() {
        FetchError::Unreachable {
            url: url.to_string(),
            message: e.to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}
