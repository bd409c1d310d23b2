//! Same-site breadth-first traversal
//!
//! The traversal owns a single accumulator (visited set, queue, title
//! registry, findings and counters). Fetches run concurrently up to the
//! configured worker count, but every completed fetch is folded into the
//! accumulator from the one task that drives the traversal, so counters and
//! findings are never shared between workers.

use crate::crawler::classifier::{classify, LinkOrigin, TitleRegistry};
use crate::crawler::fetcher::{FetchedPage, PageFetcher};
use crate::state::Findings;
use crate::url::{is_same_site, normalize_url, site_key};
use crate::FetchError;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use tokio::sync::watch;
use url::Url;

/// Progress counters of a running traversal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlProgress {
    /// Same-site pages discovered so far, including the seed
    pub pages_found: u64,

    /// Pages fetched and classified so far
    pub pages_crawled: u64,
}

/// Final result of a traversal
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraversalReport {
    pub pages_found: u64,
    pub pages_crawled: u64,
    pub findings: Findings,
}

/// A page waiting to be fetched
#[derive(Debug, Clone)]
struct QueuedPage {
    url: Url,
    origin: LinkOrigin,
}

/// Traversal state, owned by the driving task
struct Accumulator {
    seed: Url,
    max_pages: usize,
    visited: HashSet<String>,
    queue: VecDeque<QueuedPage>,
    titles: TitleRegistry,
    findings: Findings,
    pages_found: u64,
    pages_crawled: u64,
}

impl Accumulator {
    fn new(seed: Url, max_pages: usize) -> Self {
        let mut acc = Self {
            seed: seed.clone(),
            max_pages,
            visited: HashSet::new(),
            queue: VecDeque::new(),
            titles: TitleRegistry::new(),
            findings: Findings::default(),
            pages_found: 0,
            pages_crawled: 0,
        };

        let origin = LinkOrigin::new(seed.as_str(), "");
        acc.visited.insert(site_key(&seed));
        acc.pages_found = 1;
        acc.queue.push_back(QueuedPage { url: seed, origin });
        acc
    }

    /// Folds one completed fetch into the accumulator
    fn absorb(&mut self, queued: QueuedPage, page: FetchedPage) {
        self.pages_crawled += 1;
        let url = queued.url.as_str();

        tracing::debug!("Fetched {} with status {}", url, page.status_code);

        let findings = classify(&page, url, &queued.origin, &self.titles);
        if page.status_code == 200 {
            if let Some(title) = page.title.as_deref().filter(|t| !t.trim().is_empty()) {
                self.titles.record(title, url);
            }
        }
        self.findings.extend(findings);

        if page.status_code == 200 {
            for link in page.links {
                self.enqueue(&queued.url, &link.url, LinkOrigin::new(url, link.link_text));
            }
        } else if page.is_redirect() {
            if let Some(target) = page.redirect_target.as_deref() {
                self.enqueue(&queued.url, target, LinkOrigin::new(url, ""));
            }
        }
    }

    /// Queues a same-site link unless it was seen or the budget is spent
    fn enqueue(&mut self, base: &Url, raw: &str, origin: LinkOrigin) {
        let resolved = base
            .join(raw)
            .map_err(|e| crate::UrlError::Parse(e.to_string()))
            .and_then(|joined| normalize_url(joined.as_str()));
        let url = match resolved {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Skipping link {}: {}", raw, e);
                return;
            }
        };

        let key = site_key(&url);
        if !is_same_site(&self.seed, &url) || self.visited.contains(&key) {
            return;
        }

        if self.visited.len() >= self.max_pages {
            tracing::debug!("Page budget of {} reached, not queueing {}", self.max_pages, url);
            return;
        }

        self.visited.insert(key);
        self.pages_found += 1;
        self.queue.push_back(QueuedPage { url, origin });
    }

    fn progress(&self) -> CrawlProgress {
        CrawlProgress {
            pages_found: self.pages_found,
            pages_crawled: self.pages_crawled,
        }
    }

    fn into_report(self) -> TraversalReport {
        TraversalReport {
            pages_found: self.pages_found,
            pages_crawled: self.pages_crawled,
            findings: self.findings,
        }
    }
}

/// Breadth-first crawl of one site through a `PageFetcher`
pub struct CrawlTraversal<'a, F: PageFetcher + ?Sized> {
    fetcher: &'a F,
    max_pages: usize,
    max_concurrent: usize,
    progress: Option<watch::Sender<CrawlProgress>>,
}

impl<'a, F: PageFetcher + ?Sized> CrawlTraversal<'a, F> {
    /// Creates a traversal bounded to `max_pages` discovered pages and
    /// `max_concurrent` simultaneous fetches
    pub fn new(fetcher: &'a F, max_pages: usize, max_concurrent: usize) -> Self {
        Self {
            fetcher,
            max_pages: max_pages.max(1),
            max_concurrent: max_concurrent.max(1),
            progress: None,
        }
    }

    /// Publishes a progress snapshot after every completed fetch
    pub fn with_progress(mut self, progress: watch::Sender<CrawlProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Runs the traversal from `seed` (already normalized)
    ///
    /// Any transport failure aborts the traversal and is returned as is; no
    /// partial report is produced.
    pub async fn run(self, seed: Url) -> Result<TraversalReport, FetchError> {
        let fetcher = self.fetcher;
        let mut acc = Accumulator::new(seed, self.max_pages);
        self.publish(&acc);

        let mut in_flight = FuturesUnordered::new();

        loop {
            while in_flight.len() < self.max_concurrent {
                let Some(next) = acc.queue.pop_front() else {
                    break;
                };
                in_flight.push(async move {
                    let result = fetcher.fetch(&next.url).await;
                    (next, result)
                });
            }

            let Some((queued, result)) = in_flight.next().await else {
                break;
            };

            let page = result?;
            acc.absorb(queued, page);
            self.publish(&acc);
        }

        tracing::debug!(
            "Traversal finished: {} found, {} crawled, {} findings",
            acc.pages_found,
            acc.pages_crawled,
            acc.findings.total()
        );

        Ok(acc.into_report())
    }

    fn publish(&self, acc: &Accumulator) {
        if let Some(progress) = &self.progress {
            progress.send_replace(acc.progress());
        }
    }
}
