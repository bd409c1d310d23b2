//! Resolution of the report currently being viewed
//!
//! The selector works over completed crawls only. It picks a (website,
//! crawl) pair from an optional externally supplied crawl identifier and
//! tells the caller how the `crawl_id` navigation parameter must change so
//! that it reflects what is actually displayed.

use crate::report::aggregate::latest_completed;
use crate::state::CrawlStatus;
use crate::storage::{Crawl, CrawlId, Website, WebsiteId};
use url::form_urlencoded;

/// Name of the navigation parameter carrying the selected crawl
pub const CRAWL_ID_PARAM: &str = "crawl_id";

/// How the navigation parameter must change after a selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationAction {
    /// The parameter already matches the selection
    Keep,
    /// Set `crawl_id` to this crawl
    Rewrite(CrawlId),
    /// Remove `crawl_id`
    Clear,
}

impl NavigationAction {
    /// Applies the action to a query string, keeping other parameters
    ///
    /// ```
    /// use site_auditor::report::NavigationAction;
    ///
    /// assert_eq!(NavigationAction::Rewrite(7).apply("?crawl_id=3&tab=seo"), "tab=seo&crawl_id=7");
    /// assert_eq!(NavigationAction::Clear.apply("crawl_id=3"), "");
    /// ```
    pub fn apply(&self, query: &str) -> String {
        let query = query.trim_start_matches('?');
        if *self == Self::Keep {
            return query.to_string();
        }

        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            if key != CRAWL_ID_PARAM {
                serializer.append_pair(&key, &value);
            }
        }
        if let Self::Rewrite(id) = self {
            serializer.append_pair(CRAWL_ID_PARAM, &id.to_string());
        }
        serializer.finish()
    }
}

/// Reads `crawl_id` from a query string such as `?crawl_id=42`
pub fn crawl_id_param(query: &str) -> Option<String> {
    form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .find(|(key, _)| key == CRAWL_ID_PARAM)
        .map(|(_, value)| value.into_owned())
}

/// The (website, crawl) pair being viewed
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Selection<'a> {
    pub website: Option<&'a Website>,
    pub crawl: Option<&'a Crawl>,
}

impl Selection<'_> {
    pub fn is_empty(&self) -> bool {
        self.website.is_none() && self.crawl.is_none()
    }
}

/// A selection plus the navigation change it implies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionOutcome<'a> {
    pub selection: Selection<'a>,
    pub navigation: NavigationAction,
}

/// Selects reports from completed crawls
#[derive(Debug, Clone)]
pub struct ReportSelector<'a> {
    crawls: Vec<&'a Crawl>,
    websites: &'a [Website],
}

impl<'a> ReportSelector<'a> {
    /// Builds a selector; crawls that are not completed are ignored
    pub fn new(crawls: &'a [Crawl], websites: &'a [Website]) -> Self {
        Self {
            crawls: crawls
                .iter()
                .filter(|c| c.status == CrawlStatus::Completed)
                .collect(),
            websites,
        }
    }

    pub fn websites(&self) -> &'a [Website] {
        self.websites
    }

    /// Completed crawls of one website, most recent first
    pub fn crawls_for_website(&self, website_id: WebsiteId) -> Vec<&'a Crawl> {
        let mut crawls: Vec<&'a Crawl> = self
            .crawls
            .iter()
            .copied()
            .filter(|c| c.website_id == website_id)
            .collect();
        crawls.sort_by(|a, b| (b.created_date, b.id).cmp(&(a.created_date, a.id)));
        crawls
    }

    /// The most recent completed crawl across all websites
    pub fn latest(&self) -> Option<&'a Crawl> {
        latest_completed(self.crawls.iter().copied())
    }

    fn find_crawl(&self, requested: &str) -> Option<&'a Crawl> {
        let id: CrawlId = requested.trim().parse().ok()?;
        self.crawls.iter().copied().find(|c| c.id == id)
    }

    fn website_of(&self, crawl: &Crawl) -> Option<&'a Website> {
        self.websites.iter().find(|w| w.id == crawl.website_id)
    }

    fn pair(&self, crawl: &'a Crawl) -> Selection<'a> {
        Selection {
            website: self.website_of(crawl),
            crawl: Some(crawl),
        }
    }

    /// Resolves the initial selection from an optional `crawl_id`
    ///
    /// | `crawl_id` | Selection | Navigation |
    /// |------------|-----------|------------|
    /// | known | that crawl | `Keep` |
    /// | unknown | latest crawl | `Rewrite(latest)`, or `Clear` when there is none |
    /// | absent | latest crawl | `Rewrite(latest)`, or `Keep` when there is none |
    pub fn select(&self, requested: Option<&str>) -> SelectionOutcome<'a> {
        if let Some(requested) = requested {
            if let Some(crawl) = self.find_crawl(requested) {
                return SelectionOutcome {
                    selection: self.pair(crawl),
                    navigation: NavigationAction::Keep,
                };
            }
            tracing::debug!("Discarding unknown crawl_id {:?}", requested);
        }

        match self.latest() {
            Some(crawl) => SelectionOutcome {
                selection: self.pair(crawl),
                navigation: NavigationAction::Rewrite(crawl.id),
            },
            None => SelectionOutcome {
                selection: Selection::default(),
                navigation: if requested.is_some() {
                    NavigationAction::Clear
                } else {
                    NavigationAction::Keep
                },
            },
        }
    }

    /// Switches to a website and its most recent completed crawl
    pub fn select_website(&self, website_id: WebsiteId) -> SelectionOutcome<'a> {
        let website = self.websites.iter().find(|w| w.id == website_id);
        let crawl = latest_completed(
            self.crawls
                .iter()
                .copied()
                .filter(|c| c.website_id == website_id),
        );

        SelectionOutcome {
            selection: Selection { website, crawl },
            navigation: match crawl {
                Some(crawl) => NavigationAction::Rewrite(crawl.id),
                None => NavigationAction::Clear,
            },
        }
    }

    /// Switches to a specific crawl; an unknown id leaves `current` as is
    pub fn select_crawl(&self, current: Selection<'a>, crawl_id: CrawlId) -> SelectionOutcome<'a> {
        match self.crawls.iter().copied().find(|c| c.id == crawl_id) {
            Some(crawl) => SelectionOutcome {
                selection: self.pair(crawl),
                navigation: NavigationAction::Rewrite(crawl.id),
            },
            None => SelectionOutcome {
                selection: current,
                navigation: NavigationAction::Keep,
            },
        }
    }
}
