//! Test doubles for the crawler: an in-memory site and a storage wrapper
//! that fails on demand

use crate::crawler::fetcher::{FetchedPage, PageFetcher};
use crate::crawler::parser::OutboundLink;
use crate::state::CrawlStatus;
use crate::storage::{
    Crawl, CrawlId, CrawlUpdate, NewCrawl, NewWebsite, SqliteStorage, Storage, StorageError,
    StorageResult, Website, WebsiteId, WebsiteUpdate,
};
use crate::FetchError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
enum Response {
    Page(FetchedPage),
    Unreachable,
    Panic,
}

/// A fake website: unknown URLs answer 404
#[derive(Debug, Default)]
pub struct FakeSite {
    responses: HashMap<String, Response>,
    latency: Option<Duration>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// A 200 HTML page with the given metadata and `(href, text)` links
    pub fn page(
        mut self,
        url: &str,
        title: Option<&str>,
        description: Option<&str>,
        links: &[(&str, &str)],
    ) -> Self {
        let page = FetchedPage {
            status_code: 200,
            content_type: Some("text/html; charset=utf-8".to_string()),
            title: title.map(str::to_string),
            description: description.map(str::to_string),
            links: links
                .iter()
                .map(|(href, text)| OutboundLink {
                    url: href.to_string(),
                    link_text: text.to_string(),
                })
                .collect(),
            ..FetchedPage::default()
        };
        self.responses.insert(url.to_string(), Response::Page(page));
        self
    }

    pub fn status(mut self, url: &str, status_code: u16) -> Self {
        let page = FetchedPage {
            status_code,
            ..FetchedPage::default()
        };
        self.responses.insert(url.to_string(), Response::Page(page));
        self
    }

    pub fn redirect(mut self, url: &str, status_code: u16, target: &str) -> Self {
        let page = FetchedPage {
            status_code,
            redirect_target: Some(target.to_string()),
            ..FetchedPage::default()
        };
        self.responses.insert(url.to_string(), Response::Page(page));
        self
    }

    pub fn unreachable(mut self, url: &str) -> Self {
        self.responses.insert(url.to_string(), Response::Unreachable);
        self
    }

    pub fn panics(mut self, url: &str) -> Self {
        self.responses.insert(url.to_string(), Response::Panic);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// URLs fetched so far, in request order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of fetches that were running at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for FakeSite {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        match self.latency {
            Some(latency) => tokio::time::sleep(latency).await,
            None => tokio::task::yield_now().await,
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.responses.get(url.as_str()) {
            Some(Response::Page(page)) => Ok(page.clone()),
            Some(Response::Unreachable) => Err(FetchError::Unreachable {
                url: url.to_string(),
                message: "connection refused".to_string(),
            }),
            Some(Response::Panic) => panic!("fetcher blew up on {}", url),
            None => Ok(FetchedPage {
                status_code: 404,
                content_type: Some("text/html".to_string()),
                ..FetchedPage::default()
            }),
        }
    }
}

/// Storage wrapper that injects write failures
pub struct FailingStorage {
    pub inner: SqliteStorage,
    /// `create_crawl` fails
    pub fail_create_crawl: bool,
    /// Any crawl write that sets this status fails
    pub fail_crawl_status: Option<CrawlStatus>,
    /// Every write fails
    pub fail_all_writes: bool,
    /// The first website update that records a completion fails
    pub fail_website_completion_once: bool,
    /// Before the first progress write lands, another writer settles the
    /// crawl with this status
    pub settle_before_progress: Option<CrawlStatus>,
}

impl FailingStorage {
    pub fn new() -> Self {
        Self {
            inner: SqliteStorage::new_in_memory().unwrap(),
            fail_create_crawl: false,
            fail_crawl_status: None,
            fail_all_writes: false,
            fail_website_completion_once: false,
            settle_before_progress: None,
        }
    }

    fn injected() -> StorageError {
        StorageError::ConstraintViolation("injected failure".to_string())
    }
}

impl Storage for FailingStorage {
    fn create_website(&mut self, website: &NewWebsite) -> StorageResult<Website> {
        if self.fail_all_writes {
            return Err(Self::injected());
        }
        self.inner.create_website(website)
    }

    fn get_website(&self, id: WebsiteId) -> StorageResult<Website> {
        self.inner.get_website(id)
    }

    fn find_website_by_url(&self, url: &str) -> StorageResult<Option<Website>> {
        self.inner.find_website_by_url(url)
    }

    fn update_website(&mut self, id: WebsiteId, update: &WebsiteUpdate) -> StorageResult<Website> {
        if self.fail_all_writes {
            return Err(Self::injected());
        }
        if self.fail_website_completion_once && update.last_crawled_date.is_some() {
            self.fail_website_completion_once = false;
            return Err(Self::injected());
        }
        self.inner.update_website(id, update)
    }

    fn list_websites(&self, limit: Option<usize>) -> StorageResult<Vec<Website>> {
        self.inner.list_websites(limit)
    }

    fn create_crawl(&mut self, crawl: &NewCrawl) -> StorageResult<Crawl> {
        if self.fail_all_writes || self.fail_create_crawl {
            return Err(Self::injected());
        }
        self.inner.create_crawl(crawl)
    }

    fn get_crawl(&self, id: CrawlId) -> StorageResult<Crawl> {
        self.inner.get_crawl(id)
    }

    fn update_crawl(&mut self, id: CrawlId, update: &CrawlUpdate) -> StorageResult<Crawl> {
        if self.fail_all_writes
            || (update.status.is_some() && update.status == self.fail_crawl_status)
        {
            return Err(Self::injected());
        }
        self.inner.update_crawl(id, update)
    }

    fn advance_crawl(
        &mut self,
        id: CrawlId,
        update: &CrawlUpdate,
    ) -> StorageResult<Option<Crawl>> {
        if self.fail_all_writes
            || (update.status.is_some() && update.status == self.fail_crawl_status)
        {
            return Err(Self::injected());
        }
        if update.status.is_none() {
            if let Some(status) = self.settle_before_progress.take() {
                self.inner.update_crawl(id, &CrawlUpdate::status(status))?;
            }
        }
        self.inner.advance_crawl(id, update)
    }

    fn list_crawls(&self, limit: Option<usize>) -> StorageResult<Vec<Crawl>> {
        self.inner.list_crawls(limit)
    }

    fn list_crawls_for_website(
        &self,
        website_id: WebsiteId,
        limit: Option<usize>,
    ) -> StorageResult<Vec<Crawl>> {
        self.inner.list_crawls_for_website(website_id, limit)
    }
}
