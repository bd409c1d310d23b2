//! Report aggregation and selection
//!
//! Read-only views over persisted websites and crawls: dashboard totals,
//! health scores, active crawl progress, crawl history, and resolution of
//! the report currently being viewed.

mod aggregate;
mod selector;

pub use aggregate::{
    active_crawls, completed_totals, crawl_history, dashboard_totals, health_overview,
    health_score, latest_completed, load_dashboard, progress_percent, website_health,
    website_rollup, ActiveCrawl, CrawlStats, Dashboard, DashboardTotals, HealthBand,
    HistoryEntry, WebsiteHealth, FAIR_HEALTH, GOOD_HEALTH,
};
pub use selector::{
    crawl_id_param, NavigationAction, ReportSelector, Selection, SelectionOutcome,
    CRAWL_ID_PARAM,
};
