//! Crawl orchestration
//!
//! The orchestrator drives one crawl record from `pending` through
//! `crawling` to `completed` or `failed`:
//! - Resolving (or registering) the website by normalized URL
//! - Opening the crawl record and persisting every status transition
//! - Running the traversal while persisting progress counters
//! - Broadcasting status and progress events to subscribers
//! - Reconciling the crawl and website to a terminal status on every exit path

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::recovery::reconcile_stale_crawls;
use crate::crawler::traversal::{CrawlProgress, CrawlTraversal, TraversalReport};
use crate::state::CrawlStatus;
use crate::storage::{
    Crawl, CrawlId, CrawlUpdate, NewCrawl, NewWebsite, Storage, StorageResult, Website, WebsiteId,
    WebsiteUpdate,
};
use crate::url::{extract_host, normalize_url};
use crate::{AuditError, Result};
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tokio::sync::{broadcast, watch};
use url::Url;

/// Schedule recorded for websites registered without one
pub const DEFAULT_SCHEDULE: &str = "manual";

const EVENT_CAPACITY: usize = 256;

/// A request to crawl one website
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    pub url: String,
    /// Display name; defaults to the host for new websites
    pub name: Option<String>,
    /// Desired cadence; left unchanged for known websites when absent
    pub schedule: Option<String>,
}

impl CrawlRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: None,
            schedule: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_schedule(mut self, schedule: impl Into<String>) -> Self {
        self.schedule = Some(schedule.into());
        self
    }
}

/// Notification pushed to subscribers while a crawl runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlEvent {
    /// A crawl (or, when no crawl record exists, its website) changed status
    StatusChanged {
        crawl_id: Option<CrawlId>,
        website_id: WebsiteId,
        status: CrawlStatus,
    },
    /// Progress counters of a running crawl
    Progress {
        crawl_id: CrawlId,
        progress: CrawlProgress,
    },
}

/// Terminal result of one orchestrated crawl
#[derive(Debug)]
pub struct CrawlOutcome {
    /// The crawl record in its terminal state
    pub crawl: Crawl,
    /// Why the crawl failed, if it did
    pub error: Option<AuditError>,
}

impl CrawlOutcome {
    pub fn is_completed(&self) -> bool {
        self.crawl.status == CrawlStatus::Completed
    }
}

/// What has been persisted so far for the crawl in flight
#[derive(Debug, Default)]
struct CrawlHandles {
    website_id: Option<WebsiteId>,
    crawl_id: Option<CrawlId>,
    status: Option<CrawlStatus>,
    progress: CrawlProgress,
}

/// Drives crawls against a storage backend and a page fetcher
pub struct CrawlOrchestrator<S: Storage, F: PageFetcher> {
    storage: S,
    fetcher: F,
    config: CrawlerConfig,
    events: broadcast::Sender<CrawlEvent>,
}

impl<S: Storage, F: PageFetcher> CrawlOrchestrator<S, F> {
    pub fn new(storage: S, fetcher: F, config: CrawlerConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            storage,
            fetcher,
            config,
            events,
        }
    }

    /// Subscribes to status and progress events of subsequent crawls
    pub fn subscribe(&self) -> broadcast::Receiver<CrawlEvent> {
        self.events.subscribe()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Forces abandoned crawls older than the configured grace period to `failed`
    pub fn reconcile_stale(&mut self) -> StorageResult<Vec<CrawlId>> {
        reconcile_stale_crawls(
            &mut self.storage,
            self.config.stale_crawl_grace(),
            Utc::now(),
        )
    }

    /// Runs one crawl to a terminal state
    ///
    /// # Returns
    ///
    /// * `Ok(outcome)` - The crawl reached `completed`, or reached `failed`
    ///   because traversal failed or another writer settled the record first
    ///   (`outcome.error` holds the cause)
    /// * `Err(AuditError)` - The URL was invalid (nothing was persisted), or
    ///   the terminal state could not be persisted
    pub async fn run(&mut self, request: CrawlRequest) -> Result<CrawlOutcome> {
        let seed = normalize_url(&request.url)?;
        let mut handles = CrawlHandles::default();

        let result = self.drive(&request, seed, &mut handles).await;
        self.finalize(handles, result)
    }

    async fn drive(
        &mut self,
        request: &CrawlRequest,
        seed: Url,
        handles: &mut CrawlHandles,
    ) -> Result<TraversalReport> {
        let website = self.resolve_website(request, &seed)?;
        handles.website_id = Some(website.id);

        let crawl = self.storage.create_crawl(&NewCrawl {
            website_id: website.id,
            website_url: website.url.clone(),
            status: CrawlStatus::Pending,
        })?;
        handles.crawl_id = Some(crawl.id);
        handles.status = Some(crawl.status);
        tracing::info!("Crawl {} created for {}", crawl.id, website.url);
        self.emit_status(handles);

        self.transition(handles, CrawlStatus::Crawling)?;
        tracing::info!("Crawl {} is crawling {}", crawl.id, seed);

        self.traverse(seed, crawl.id, handles).await
    }

    /// Finds the website by normalized URL or registers it
    fn resolve_website(&mut self, request: &CrawlRequest, seed: &Url) -> Result<Website> {
        let url = seed.to_string();
        let schedule = request
            .schedule
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let website = match self.storage.find_website_by_url(&url)? {
            Some(existing) => {
                tracing::debug!("Using existing website {} for {}", existing.id, url);
                self.storage.update_website(
                    existing.id,
                    &WebsiteUpdate {
                        schedule,
                        last_crawl_status: Some(CrawlStatus::Pending),
                        ..WebsiteUpdate::default()
                    },
                )?
            }
            None => {
                let name = request
                    .name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string)
                    .or_else(|| extract_host(seed))
                    .unwrap_or_else(|| url.clone());

                let website = self.storage.create_website(&NewWebsite {
                    url: url.clone(),
                    name,
                    schedule: schedule.unwrap_or_else(|| DEFAULT_SCHEDULE.to_string()),
                    last_crawl_status: CrawlStatus::Pending,
                })?;
                tracing::info!("Registered website {} ({})", website.id, website.url);
                website
            }
        };

        Ok(website)
    }

    /// Persists a status transition on both the crawl and its website
    fn transition(&mut self, handles: &mut CrawlHandles, to: CrawlStatus) -> Result<()> {
        let (Some(website_id), Some(crawl_id)) = (handles.website_id, handles.crawl_id) else {
            return Err(AuditError::TraversalFault(
                "status transition without a crawl record".to_string(),
            ));
        };
        let from = handles.status.unwrap_or(CrawlStatus::Pending);
        if !from.can_transition_to(to) {
            return Err(AuditError::InvalidTransition { crawl_id, from, to });
        }

        advance(&mut self.storage, crawl_id, &CrawlUpdate::status(to))?;
        handles.status = Some(to);
        self.storage
            .update_website(website_id, &WebsiteUpdate::status(to))?;
        self.emit_status(handles);

        Ok(())
    }

    /// Runs the traversal, persisting progress snapshots as they arrive
    async fn traverse(
        &mut self,
        seed: Url,
        crawl_id: CrawlId,
        handles: &mut CrawlHandles,
    ) -> Result<TraversalReport> {
        let (progress_tx, mut progress_rx) = watch::channel(CrawlProgress::default());
        let traversal = CrawlTraversal::new(
            &self.fetcher,
            self.config.max_pages,
            self.config.max_concurrent_fetches,
        )
        .with_progress(progress_tx);

        let storage = &mut self.storage;
        let events = &self.events;

        let task = AssertUnwindSafe(traversal.run(seed)).catch_unwind();
        tokio::pin!(task);
        let mut progress_open = true;

        let outcome = loop {
            tokio::select! {
                outcome = &mut task => break match outcome {
                    Ok(Ok(report)) => Ok(report),
                    Ok(Err(e)) => Err(AuditError::Fetch(e)),
                    Err(panic) => Err(AuditError::TraversalFault(panic_message(panic.as_ref()))),
                },
                changed = progress_rx.changed(), if progress_open => {
                    if changed.is_err() {
                        progress_open = false;
                        continue;
                    }
                    let progress = *progress_rx.borrow_and_update();
                    handles.progress = progress;

                    let update = CrawlUpdate::progress(progress.pages_found, progress.pages_crawled);
                    match advance(storage, crawl_id, &update) {
                        Ok(_) => {}
                        Err(settled @ AuditError::CrawlSettled { .. }) => {
                            tracing::warn!(
                                "Crawl {} was settled elsewhere, stopping traversal",
                                crawl_id
                            );
                            break Err(settled);
                        }
                        Err(e) => tracing::warn!(
                            "Failed to persist progress of crawl {}: {}",
                            crawl_id,
                            e
                        ),
                    }
                    let _ = events.send(CrawlEvent::Progress { crawl_id, progress });
                }
            }
        };

        handles.progress = *progress_rx.borrow();
        outcome
    }

    /// Reconciles the crawl and website to a terminal status
    fn finalize(
        &mut self,
        mut handles: CrawlHandles,
        result: Result<TraversalReport>,
    ) -> Result<CrawlOutcome> {
        let cause = match result {
            Ok(report) => match self.complete(&mut handles, report) {
                Ok(crawl) => {
                    return Ok(CrawlOutcome { crawl, error: None });
                }
                Err(e) => e,
            },
            Err(e) => e,
        };

        match handles.crawl_id {
            Some(crawl_id) => {
                tracing::error!("Crawl {} did not complete cleanly: {}", crawl_id, cause)
            }
            None => tracing::error!("Crawl could not be started: {}", cause),
        }

        let crawl = self.settle_failure(&mut handles).map_err(|settle| {
            tracing::error!("Failed to record terminal status: {}", settle);
            AuditError::from(settle)
        })?;

        match crawl {
            // The completed crawl was persisted and the website caught up on retry
            Some(crawl) if crawl.status == CrawlStatus::Completed => {
                tracing::info!("Crawl {} recorded as completed after retry", crawl.id);
                Ok(CrawlOutcome { crawl, error: None })
            }
            Some(crawl) if !matches!(cause, AuditError::Storage(_)) => Ok(CrawlOutcome {
                crawl,
                error: Some(cause),
            }),
            _ => Err(cause),
        }
    }

    fn complete(&mut self, handles: &mut CrawlHandles, report: TraversalReport) -> Result<Crawl> {
        let (Some(website_id), Some(crawl_id)) = (handles.website_id, handles.crawl_id) else {
            return Err(AuditError::TraversalFault(
                "traversal finished without a crawl record".to_string(),
            ));
        };
        let from = handles.status.unwrap_or(CrawlStatus::Pending);
        if !from.can_transition_to(CrawlStatus::Completed) {
            return Err(AuditError::InvalidTransition {
                crawl_id,
                from,
                to: CrawlStatus::Completed,
            });
        }

        let totals = report.findings.total();
        let crawl = advance(
            &mut self.storage,
            crawl_id,
            &CrawlUpdate {
                status: Some(CrawlStatus::Completed),
                pages_found: Some(report.pages_found),
                pages_crawled: Some(report.pages_crawled),
                findings: Some(report.findings),
            },
        )?;
        handles.status = Some(CrawlStatus::Completed);
        self.storage
            .update_website(website_id, &WebsiteUpdate::completed_at(Utc::now()))?;
        self.emit_status(handles);

        tracing::info!(
            "Crawl {} completed: {} pages found, {} crawled, {} findings",
            crawl_id,
            crawl.pages_found,
            crawl.pages_crawled,
            totals
        );

        Ok(crawl)
    }

    /// Marks whatever was persisted as failed, unless it already is terminal
    ///
    /// The website always ends up mirroring the crawl's terminal status, or
    /// `failed` when no crawl record could be created.
    fn settle_failure(&mut self, handles: &mut CrawlHandles) -> StorageResult<Option<Crawl>> {
        let crawl = match handles.crawl_id {
            Some(crawl_id) => {
                let current = self.storage.get_crawl(crawl_id)?;
                let failed = CrawlUpdate {
                    status: Some(CrawlStatus::Failed),
                    pages_found: Some(handles.progress.pages_found.max(current.pages_found)),
                    pages_crawled: Some(handles.progress.pages_crawled.max(current.pages_crawled)),
                    findings: None,
                };
                let crawl = if current.status.is_terminal() {
                    current
                } else {
                    match self.storage.advance_crawl(crawl_id, &failed)? {
                        Some(crawl) => crawl,
                        None => self.storage.get_crawl(crawl_id)?,
                    }
                };
                handles.status = Some(crawl.status);
                Some(crawl)
            }
            None => None,
        };

        if let Some(website_id) = handles.website_id {
            let status = crawl.as_ref().map(|c| c.status).unwrap_or(CrawlStatus::Failed);
            let update = match status {
                CrawlStatus::Completed => WebsiteUpdate::completed_at(Utc::now()),
                other => WebsiteUpdate::status(other),
            };
            self.storage.update_website(website_id, &update)?;
            handles.status = Some(status);
            self.emit_status(handles);
        }

        Ok(crawl)
    }

    fn emit_status(&self, handles: &CrawlHandles) {
        if let (Some(website_id), Some(status)) = (handles.website_id, handles.status) {
            // No subscribers is fine
            let _ = self.events.send(CrawlEvent::StatusChanged {
                crawl_id: handles.crawl_id,
                website_id,
                status,
            });
        }
    }
}

/// Writes `update` unless another writer already settled the crawl
fn advance<S: Storage + ?Sized>(
    storage: &mut S,
    crawl_id: CrawlId,
    update: &CrawlUpdate,
) -> Result<Crawl> {
    match storage.advance_crawl(crawl_id, update)? {
        Some(crawl) => Ok(crawl),
        None => {
            let settled = storage.get_crawl(crawl_id)?;
            Err(AuditError::CrawlSettled {
                crawl_id,
                status: settled.status,
            })
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "traversal panicked".to_string()
    }
}
