//! Startup reconciliation of abandoned crawls
//!
//! A crawl whose driving process died stays `pending` or `crawling` forever.
//! Once such a crawl is older than the grace period it is forced to `failed`,
//! and its website is updated when that crawl is the website's latest.

use crate::state::CrawlStatus;
use crate::storage::{CrawlId, CrawlUpdate, Storage, StorageError, StorageResult, WebsiteUpdate};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Forces non-terminal crawls older than `grace` to `failed`
///
/// Returns the ids of the crawls that were reconciled, most recent first.
pub fn reconcile_stale_crawls<S: Storage + ?Sized>(
    storage: &mut S,
    grace: Duration,
    now: DateTime<Utc>,
) -> StorageResult<Vec<CrawlId>> {
    let stale: Vec<_> = storage
        .list_crawls(None)?
        .into_iter()
        .filter(|crawl| crawl.status.is_active())
        .filter(|crawl| {
            (now - crawl.created_date)
                .to_std()
                .map(|age| age > grace)
                .unwrap_or(false)
        })
        .collect();

    let mut reconciled = Vec::with_capacity(stale.len());

    for crawl in stale {
        let update = CrawlUpdate::status(CrawlStatus::Failed);
        if storage.advance_crawl(crawl.id, &update)?.is_none() {
            tracing::debug!("Crawl {} finished before it could be reconciled", crawl.id);
            continue;
        }
        tracing::info!(
            "Crawl {} of {} was left {} since {}, marked failed",
            crawl.id,
            crawl.website_url,
            crawl.status,
            crawl.created_date
        );

        let latest = storage.list_crawls_for_website(crawl.website_id, Some(1))?;
        if latest.first().map(|c| c.id) == Some(crawl.id) {
            match storage.update_website(crawl.website_id, &WebsiteUpdate::status(CrawlStatus::Failed)) {
                Ok(_) => {}
                Err(StorageError::WebsiteNotFound(id)) => {
                    tracing::warn!("Website {} of crawl {} no longer exists", id, crawl.id);
                }
                Err(e) => return Err(e),
            }
        }

        reconciled.push(crawl.id);
    }

    Ok(reconciled)
}
