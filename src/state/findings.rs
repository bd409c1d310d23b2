//! Finding records produced while classifying crawled pages
//!
//! These are persisted verbatim (as JSON) on the crawl record, in the order
//! they were discovered.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A link that led to an HTTP 404 response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokenLink {
    pub url: String,
    pub source_page: String,
    pub link_text: String,
}

/// A link that answered with a permanent redirect (301 or 308)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermanentRedirect {
    pub from_url: String,
    pub to_url: String,
    pub source_page: String,
}

/// Kind of SEO defect found on a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeoIssueType {
    MissingTitle,
    MissingDescription,
    DuplicateTitle,
}

impl SeoIssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingTitle => "missing_title",
            Self::MissingDescription => "missing_description",
            Self::DuplicateTitle => "duplicate_title",
        }
    }
}

impl fmt::Display for SeoIssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An SEO defect on a single page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeoIssue {
    pub url: String,
    pub issue_type: SeoIssueType,
    pub description: String,
}

/// A single classified finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    BrokenLink(BrokenLink),
    Redirect(PermanentRedirect),
    Seo(SeoIssue),
}

/// The three ordered finding lists of one crawl
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Findings {
    pub errors_404: Vec<BrokenLink>,
    pub redirects_301: Vec<PermanentRedirect>,
    pub seo_issues: Vec<SeoIssue>,
}

impl Findings {
    /// Appends a finding to the list it belongs to
    pub fn push(&mut self, finding: Finding) {
        match finding {
            Finding::BrokenLink(link) => self.errors_404.push(link),
            Finding::Redirect(redirect) => self.redirects_301.push(redirect),
            Finding::Seo(issue) => self.seo_issues.push(issue),
        }
    }

    /// Total number of findings across all three lists
    pub fn total(&self) -> usize {
        self.errors_404.len() + self.redirects_301.len() + self.seo_issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl Extend<Finding> for Findings {
    fn extend<T: IntoIterator<Item = Finding>>(&mut self, iter: T) {
        for finding in iter {
            self.push(finding);
        }
    }
}
