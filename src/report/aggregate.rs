//! Read-side statistics over persisted crawl records
//!
//! Everything here is a pure function of the website and crawl lists it is
//! given; loading those lists is the caller's job (see `load_dashboard`).

use crate::config::ReportsConfig;
use crate::state::CrawlStatus;
use crate::storage::{Crawl, CrawlId, Storage, StorageResult, Website, WebsiteId};
use std::fmt;

/// Health score at or above which a website is in good shape
pub const GOOD_HEALTH: u32 = 80;

/// Health score at or above which a website is in fair shape
pub const FAIR_HEALTH: u32 = 60;

/// Points deducted from the health score per finding
const POINTS_PER_ISSUE: usize = 5;

/// Finding counts of one crawl (or a sum of crawls)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub errors_404: usize,
    pub redirects_301: usize,
    pub seo_issues: usize,
}

impl CrawlStats {
    pub fn of(crawl: &Crawl) -> Self {
        Self {
            errors_404: crawl.findings.errors_404.len(),
            redirects_301: crawl.findings.redirects_301.len(),
            seo_issues: crawl.findings.seo_issues.len(),
        }
    }

    pub fn total(&self) -> usize {
        self.errors_404 + self.redirects_301 + self.seo_issues
    }
}

impl std::ops::Add for CrawlStats {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            errors_404: self.errors_404 + other.errors_404,
            redirects_301: self.redirects_301 + other.redirects_301,
            seo_issues: self.seo_issues + other.seo_issues,
        }
    }
}

impl std::iter::Sum for CrawlStats {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, stats| acc + stats)
    }
}

/// Headline numbers for the dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardTotals {
    pub total_websites: usize,
    /// Sums over the completed crawls in the window
    pub issues: CrawlStats,
}

/// Sums finding counts over the completed crawls in `crawls`
pub fn completed_totals<'a>(crawls: impl IntoIterator<Item = &'a Crawl>) -> CrawlStats {
    crawls
        .into_iter()
        .filter(|c| c.status == CrawlStatus::Completed)
        .map(CrawlStats::of)
        .sum()
}

/// Totals across all websites over a recent window of crawls
pub fn dashboard_totals(websites: &[Website], recent_crawls: &[Crawl]) -> DashboardTotals {
    DashboardTotals {
        total_websites: websites.len(),
        issues: completed_totals(recent_crawls),
    }
}

/// Totals for one website over a recent window of crawls
pub fn website_rollup(website_id: WebsiteId, recent_crawls: &[Crawl]) -> CrawlStats {
    completed_totals(recent_crawls.iter().filter(|c| c.website_id == website_id))
}

/// `max(0, 100 - 5 * issues)`
pub fn health_score(stats: &CrawlStats) -> u32 {
    let penalty = stats.total().saturating_mul(POINTS_PER_ISSUE);
    100usize.saturating_sub(penalty) as u32
}

/// Coarse health rating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthBand {
    Good,
    Fair,
    Poor,
}

impl HealthBand {
    pub fn from_score(score: u32) -> Self {
        if score >= GOOD_HEALTH {
            Self::Good
        } else if score >= FAIR_HEALTH {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
        }
    }
}

impl fmt::Display for HealthBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health of one website, judged by its most recent completed crawl
#[derive(Debug, Clone, PartialEq)]
pub struct WebsiteHealth {
    pub website_id: WebsiteId,
    pub name: String,
    pub url: String,
    pub crawl_id: CrawlId,
    pub stats: CrawlStats,
    pub score: u32,
    pub band: HealthBand,
}

/// The completed crawl with the greatest `created_date` (then id)
pub fn latest_completed<'a>(crawls: impl IntoIterator<Item = &'a Crawl>) -> Option<&'a Crawl> {
    crawls
        .into_iter()
        .filter(|c| c.status == CrawlStatus::Completed)
        .max_by_key(|c| (c.created_date, c.id))
}

/// Health entry for a website; `None` when it has no completed crawl
pub fn website_health(website: &Website, crawls: &[Crawl]) -> Option<WebsiteHealth> {
    let crawl = latest_completed(crawls.iter().filter(|c| c.website_id == website.id))?;
    let stats = CrawlStats::of(crawl);
    let score = health_score(&stats);

    Some(WebsiteHealth {
        website_id: website.id,
        name: website.name.clone(),
        url: website.url.clone(),
        crawl_id: crawl.id,
        stats,
        score,
        band: HealthBand::from_score(score),
    })
}

/// Health entries for the first `limit` websites that have a completed crawl
///
/// `websites` is expected most recent first; websites without a completed
/// crawl are skipped but still count toward `limit`.
pub fn health_overview(websites: &[Website], crawls: &[Crawl], limit: usize) -> Vec<WebsiteHealth> {
    websites
        .iter()
        .take(limit)
        .filter_map(|website| website_health(website, crawls))
        .collect()
}

/// A crawl that has not reached a terminal status yet
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveCrawl {
    pub crawl_id: CrawlId,
    pub website_url: String,
    pub status: CrawlStatus,
    pub pages_found: u64,
    pub pages_crawled: u64,
    pub percent: f64,
}

/// Progress of a crawl as a percentage
///
/// Crawling with nothing found yet shows a token 5%.
pub fn progress_percent(crawl: &Crawl) -> f64 {
    if crawl.pages_found > 0 {
        (crawl.pages_crawled as f64 / crawl.pages_found as f64 * 100.0).min(100.0)
    } else if crawl.status == CrawlStatus::Crawling {
        5.0
    } else {
        0.0
    }
}

/// Pending and crawling crawls, in the order given
pub fn active_crawls(crawls: &[Crawl]) -> Vec<ActiveCrawl> {
    crawls
        .iter()
        .filter(|c| c.status.is_active())
        .map(|c| ActiveCrawl {
            crawl_id: c.id,
            website_url: c.website_url.clone(),
            status: c.status,
            pages_found: c.pages_found,
            pages_crawled: c.pages_crawled,
            percent: progress_percent(c),
        })
        .collect()
}

/// A crawl paired with its website
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryEntry<'a> {
    pub crawl: &'a Crawl,
    pub website: &'a Website,
}

impl HistoryEntry<'_> {
    pub fn stats(&self) -> CrawlStats {
        CrawlStats::of(self.crawl)
    }
}

/// Joins crawls with their websites, dropping crawls of unknown websites
pub fn crawl_history<'a>(crawls: &'a [Crawl], websites: &'a [Website]) -> Vec<HistoryEntry<'a>> {
    crawls
        .iter()
        .filter_map(|crawl| {
            websites
                .iter()
                .find(|w| w.id == crawl.website_id)
                .map(|website| HistoryEntry { crawl, website })
        })
        .collect()
}

/// Raw records behind the dashboard
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    /// All websites, most recent first
    pub websites: Vec<Website>,
    /// The recent crawl window, most recent first
    pub crawls: Vec<Crawl>,
    pub history_limit: usize,
    pub health_limit: usize,
}

impl Dashboard {
    pub fn totals(&self) -> DashboardTotals {
        dashboard_totals(&self.websites, &self.crawls)
    }

    pub fn health(&self) -> Vec<WebsiteHealth> {
        health_overview(&self.websites, &self.crawls, self.health_limit)
    }

    pub fn active(&self) -> Vec<ActiveCrawl> {
        active_crawls(&self.crawls)
    }

    pub fn history(&self) -> Vec<HistoryEntry<'_>> {
        let window = self.history_limit.min(self.crawls.len());
        crawl_history(&self.crawls[..window], &self.websites)
    }
}

/// Loads the records the dashboard is computed from
pub fn load_dashboard<S: Storage + ?Sized>(
    storage: &S,
    config: &ReportsConfig,
) -> StorageResult<Dashboard> {
    Ok(Dashboard {
        websites: storage.list_websites(None)?,
        crawls: storage.list_crawls(Some(config.recent_crawl_limit))?,
        history_limit: config.history_limit,
        health_limit: config.health_website_limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{BrokenLink, Findings, PermanentRedirect, SeoIssue, SeoIssueType};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn website(id: WebsiteId, minutes: i64) -> Website {
        Website {
            id,
            url: format!("https://site{}.example/", id),
            name: format!("Site {}", id),
            schedule: "manual".to_string(),
            last_crawl_status: CrawlStatus::Completed,
            last_crawled_date: None,
            created_date: at(minutes),
        }
    }

    fn findings(broken: usize, redirects: usize, seo: usize) -> Findings {
        Findings {
            errors_404: (0..broken)
                .map(|i| BrokenLink {
                    url: format!("https://x/{}", i),
                    source_page: "https://x/".to_string(),
                    link_text: String::new(),
                })
                .collect(),
            redirects_301: (0..redirects)
                .map(|i| PermanentRedirect {
                    from_url: format!("https://x/old{}", i),
                    to_url: "https://x/new".to_string(),
                    source_page: "https://x/".to_string(),
                })
                .collect(),
            seo_issues: (0..seo)
                .map(|i| SeoIssue {
                    url: format!("https://x/{}", i),
                    issue_type: SeoIssueType::MissingDescription,
                    description: String::new(),
                })
                .collect(),
        }
    }

    fn crawl(
        id: CrawlId,
        website_id: WebsiteId,
        status: CrawlStatus,
        minutes: i64,
        issues: (usize, usize, usize),
    ) -> Crawl {
        Crawl {
            id,
            website_id,
            website_url: format!("https://site{}.example/", website_id),
            status,
            pages_found: 10,
            pages_crawled: 10,
            findings: findings(issues.0, issues.1, issues.2),
            created_date: at(minutes),
        }
    }

    #[test]
    fn test_crawl_stats_triple() {
        let c = crawl(1, 1, CrawlStatus::Completed, 0, (3, 2, 1));
        let stats = CrawlStats::of(&c);
        assert_eq!(
            stats,
            CrawlStats {
                errors_404: 3,
                redirects_301: 2,
                seo_issues: 1
            }
        );
        assert_eq!(stats.total(), 6);
    }

    #[test]
    fn test_health_score_example() {
        let site = website(1, 0);
        let crawls = vec![crawl(1, 1, CrawlStatus::Completed, 0, (3, 2, 0))];

        let health = website_health(&site, &crawls).unwrap();
        assert_eq!(health.score, 75);
        assert_eq!(health.band, HealthBand::Fair);
    }

    #[test]
    fn test_health_score_floors_at_zero() {
        let stats = CrawlStats {
            errors_404: 30,
            redirects_301: 0,
            seo_issues: 0,
        };
        assert_eq!(health_score(&stats), 0);
        assert_eq!(health_score(&CrawlStats::default()), 100);
        assert_eq!(HealthBand::from_score(0), HealthBand::Poor);
        assert_eq!(HealthBand::from_score(80), HealthBand::Good);
    }

    #[test]
    fn test_health_uses_most_recent_completed_crawl() {
        let site = website(1, 0);
        let crawls = vec![
            crawl(3, 1, CrawlStatus::Failed, 30, (0, 0, 0)),
            crawl(2, 1, CrawlStatus::Completed, 20, (1, 0, 0)),
            crawl(1, 1, CrawlStatus::Completed, 10, (9, 9, 9)),
        ];

        let health = website_health(&site, &crawls).unwrap();
        assert_eq!(health.crawl_id, 2);
        assert_eq!(health.score, 95);
    }

    #[test]
    fn test_website_without_completed_crawl_has_no_health() {
        let site = website(1, 0);
        let crawls = vec![crawl(1, 1, CrawlStatus::Crawling, 0, (0, 0, 0))];
        assert!(website_health(&site, &crawls).is_none());
    }

    #[test]
    fn test_health_overview_limit() {
        let websites = vec![website(3, 30), website(2, 20), website(1, 10)];
        let crawls = vec![
            crawl(1, 1, CrawlStatus::Completed, 10, (0, 0, 0)),
            crawl(3, 3, CrawlStatus::Completed, 30, (0, 0, 1)),
        ];

        let overview = health_overview(&websites, &crawls, 2);
        assert_eq!(overview.len(), 1);
        assert_eq!(overview[0].website_id, 3);
    }

    #[test]
    fn test_dashboard_totals_count_completed_only() {
        let websites = vec![website(1, 0), website(2, 0)];
        let crawls = vec![
            crawl(1, 1, CrawlStatus::Completed, 0, (1, 2, 3)),
            crawl(2, 2, CrawlStatus::Completed, 1, (1, 0, 0)),
            crawl(3, 2, CrawlStatus::Failed, 2, (5, 5, 5)),
        ];

        let totals = dashboard_totals(&websites, &crawls);
        assert_eq!(totals.total_websites, 2);
        assert_eq!(totals.issues.errors_404, 2);
        assert_eq!(totals.issues.redirects_301, 2);
        assert_eq!(totals.issues.seo_issues, 3);

        assert_eq!(website_rollup(2, &crawls).total(), 1);
    }

    #[test]
    fn test_progress_percent() {
        let mut c = crawl(1, 1, CrawlStatus::Crawling, 0, (0, 0, 0));
        c.pages_found = 4;
        c.pages_crawled = 1;
        assert_eq!(progress_percent(&c), 25.0);

        c.pages_found = 0;
        c.pages_crawled = 0;
        assert_eq!(progress_percent(&c), 5.0);

        c.status = CrawlStatus::Pending;
        assert_eq!(progress_percent(&c), 0.0);
    }

    #[test]
    fn test_active_crawls_filter() {
        let crawls = vec![
            crawl(1, 1, CrawlStatus::Completed, 0, (0, 0, 0)),
            crawl(2, 1, CrawlStatus::Crawling, 1, (0, 0, 0)),
            crawl(3, 1, CrawlStatus::Pending, 2, (0, 0, 0)),
        ];
        let ids: Vec<CrawlId> = active_crawls(&crawls).iter().map(|a| a.crawl_id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_history_drops_unknown_websites() {
        let websites = vec![website(1, 0)];
        let crawls = vec![
            crawl(2, 9, CrawlStatus::Completed, 1, (0, 0, 0)),
            crawl(1, 1, CrawlStatus::Completed, 0, (0, 0, 0)),
        ];

        let history = crawl_history(&crawls, &websites);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].crawl.id, 1);
        assert_eq!(history[0].website.id, 1);
    }

    #[test]
    fn test_dashboard_history_window() {
        let dashboard = Dashboard {
            websites: vec![website(1, 0)],
            crawls: vec![
                crawl(3, 1, CrawlStatus::Completed, 2, (0, 0, 0)),
                crawl(2, 1, CrawlStatus::Completed, 1, (0, 0, 0)),
                crawl(1, 1, CrawlStatus::Completed, 0, (0, 0, 0)),
            ],
            history_limit: 2,
            health_limit: 3,
        };

        let ids: Vec<CrawlId> = dashboard.history().iter().map(|h| h.crawl.id).collect();
        assert_eq!(ids, vec![3, 2]);
        assert_eq!(dashboard.health().len(), 1);
    }
}
