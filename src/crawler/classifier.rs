//! Issue classification for fetched pages
//!
//! Classification is a pure function of the fetched page, the link that led
//! to it, and the titles seen so far in the current crawl. The traversal owns
//! the `TitleRegistry` and records each title after classifying the page.

use crate::crawler::fetcher::FetchedPage;
use crate::state::{BrokenLink, Finding, PermanentRedirect, SeoIssue, SeoIssueType};
use std::collections::HashMap;

/// How the crawler arrived at a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkOrigin {
    /// The page that linked here
    pub source_page: String,

    /// Visible text of the link
    pub link_text: String,
}

impl LinkOrigin {
    pub fn new(source_page: impl Into<String>, link_text: impl Into<String>) -> Self {
        Self {
            source_page: source_page.into(),
            link_text: link_text.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct TitleEntry {
    first_url: String,
    reported: bool,
}

/// Titles seen during one crawl, keyed by exact title text
#[derive(Debug, Clone, Default)]
pub struct TitleRegistry {
    titles: HashMap<String, TitleEntry>,
}

impl TitleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `url` carries `title`
    ///
    /// The first URL to carry a title owns it. A later URL with the same
    /// title marks the original as already reported as a duplicate.
    pub fn record(&mut self, title: &str, url: &str) {
        match self.titles.get_mut(title) {
            Some(entry) => {
                if entry.first_url != url {
                    entry.reported = true;
                }
            }
            None => {
                self.titles.insert(
                    title.to_string(),
                    TitleEntry {
                        first_url: url.to_string(),
                        reported: false,
                    },
                );
            }
        }
    }

    /// The first URL seen with `title`, and whether it was already reported
    fn lookup(&self, title: &str) -> Option<&TitleEntry> {
        self.titles.get(title)
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

/// Classifies one fetched page into zero or more findings
///
/// | Status | Findings |
/// |--------|----------|
/// | 404 | one broken link, reported against the referring page |
/// | 301, 308 | one permanent redirect |
/// | 200 (HTML) | missing title, missing description, duplicate title |
/// | anything else | none |
pub fn classify(
    page: &FetchedPage,
    url: &str,
    origin: &LinkOrigin,
    titles: &TitleRegistry,
) -> Vec<Finding> {
    match page.status_code {
        404 => vec![Finding::BrokenLink(BrokenLink {
            url: url.to_string(),
            source_page: origin.source_page.clone(),
            link_text: origin.link_text.clone(),
        })],
        301 | 308 => vec![Finding::Redirect(PermanentRedirect {
            from_url: url.to_string(),
            to_url: page.redirect_target.clone().unwrap_or_default(),
            source_page: origin.source_page.clone(),
        })],
        200 if page.is_html() => seo_findings(page, url, titles),
        _ => Vec::new(),
    }
}

fn seo_findings(page: &FetchedPage, url: &str, titles: &TitleRegistry) -> Vec<Finding> {
    let mut findings = Vec::new();

    let title = non_empty(page.title.as_deref());
    match title {
        None => findings.push(seo(url, SeoIssueType::MissingTitle, "Page has no title".to_string())),
        Some(title) => {
            if let Some(entry) = titles.lookup(title) {
                if entry.first_url != url {
                    if !entry.reported {
                        findings.push(seo(
                            &entry.first_url,
                            SeoIssueType::DuplicateTitle,
                            format!("Title \"{}\" is also used by {}", title, url),
                        ));
                    }
                    findings.push(seo(
                        url,
                        SeoIssueType::DuplicateTitle,
                        format!("Title \"{}\" is also used by {}", title, entry.first_url),
                    ));
                }
            }
        }
    }

    if non_empty(page.description.as_deref()).is_none() {
        findings.push(seo(
            url,
            SeoIssueType::MissingDescription,
            "Page has no meta description".to_string(),
        ));
    }

    findings
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn seo(url: &str, issue_type: SeoIssueType, description: String) -> Finding {
    Finding::Seo(SeoIssue {
        url: url.to_string(),
        issue_type,
        description,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html_page(title: Option<&str>, description: Option<&str>) -> FetchedPage {
        FetchedPage {
            status_code: 200,
            content_type: Some("text/html".to_string()),
            title: title.map(str::to_string),
            description: description.map(str::to_string),
            ..FetchedPage::default()
        }
    }

    fn origin() -> LinkOrigin {
        LinkOrigin::new("https://example.com/about", "Missing page")
    }

    fn seo_issues(findings: &[Finding]) -> Vec<(String, SeoIssueType)> {
        findings
            .iter()
            .filter_map(|f| match f {
                Finding::Seo(issue) => Some((issue.url.clone(), issue.issue_type)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_404_is_broken_link_from_source() {
        let page = FetchedPage {
            status_code: 404,
            ..FetchedPage::default()
        };
        let findings = classify(
            &page,
            "https://example.com/missing",
            &origin(),
            &TitleRegistry::new(),
        );

        assert_eq!(
            findings,
            vec![Finding::BrokenLink(BrokenLink {
                url: "https://example.com/missing".to_string(),
                source_page: "https://example.com/about".to_string(),
                link_text: "Missing page".to_string(),
            })]
        );
    }

    #[test]
    fn test_permanent_redirects() {
        for status in [301, 308] {
            let page = FetchedPage {
                status_code: status,
                redirect_target: Some("https://example.com/new".to_string()),
                ..FetchedPage::default()
            };
            let findings = classify(&page, "https://example.com/old", &origin(), &TitleRegistry::new());

            assert_eq!(
                findings,
                vec![Finding::Redirect(PermanentRedirect {
                    from_url: "https://example.com/old".to_string(),
                    to_url: "https://example.com/new".to_string(),
                    source_page: "https://example.com/about".to_string(),
                })]
            );
        }
    }

    #[test]
    fn test_temporary_redirect_and_server_error_produce_nothing() {
        for status in [302, 307, 500, 403] {
            let page = FetchedPage {
                status_code: status,
                ..FetchedPage::default()
            };
            assert!(classify(&page, "https://example.com/x", &origin(), &TitleRegistry::new())
                .is_empty());
        }
    }

    #[test]
    fn test_missing_title_and_description() {
        let page = html_page(None, Some("   "));
        let findings = classify(&page, "https://example.com/", &origin(), &TitleRegistry::new());

        assert_eq!(
            seo_issues(&findings),
            vec![
                ("https://example.com/".to_string(), SeoIssueType::MissingTitle),
                ("https://example.com/".to_string(), SeoIssueType::MissingDescription),
            ]
        );
    }

    #[test]
    fn test_complete_page_has_no_findings() {
        let page = html_page(Some("Home"), Some("Welcome"));
        assert!(classify(&page, "https://example.com/", &origin(), &TitleRegistry::new()).is_empty());
    }

    #[test]
    fn test_non_html_page_skips_seo_checks() {
        let page = FetchedPage {
            status_code: 200,
            content_type: Some("application/pdf".to_string()),
            ..FetchedPage::default()
        };
        assert!(classify(&page, "https://example.com/a.pdf", &origin(), &TitleRegistry::new())
            .is_empty());
    }

    #[test]
    fn test_duplicate_title_reports_both_pages_once() {
        let mut titles = TitleRegistry::new();
        let home = html_page(Some("Home"), Some("d"));

        let first = classify(&home, "https://example.com/", &origin(), &titles);
        assert!(first.is_empty());
        titles.record("Home", "https://example.com/");

        let second = classify(&home, "https://example.com/index", &origin(), &titles);
        assert_eq!(
            seo_issues(&second),
            vec![
                ("https://example.com/".to_string(), SeoIssueType::DuplicateTitle),
                ("https://example.com/index".to_string(), SeoIssueType::DuplicateTitle),
            ]
        );
        titles.record("Home", "https://example.com/index");

        // A third page only reports itself; the original is already listed
        let third = classify(&home, "https://example.com/start", &origin(), &titles);
        assert_eq!(
            seo_issues(&third),
            vec![("https://example.com/start".to_string(), SeoIssueType::DuplicateTitle)]
        );

        let about = html_page(Some("About"), Some("d"));
        assert!(classify(&about, "https://example.com/about", &origin(), &titles).is_empty());
    }

    #[test]
    fn test_title_comparison_is_case_sensitive() {
        let mut titles = TitleRegistry::new();
        titles.record("Home", "https://example.com/");

        let page = html_page(Some("home"), Some("d"));
        assert!(classify(&page, "https://example.com/other", &origin(), &titles).is_empty());
    }

    #[test]
    fn test_same_url_is_not_its_own_duplicate() {
        let mut titles = TitleRegistry::new();
        titles.record("Home", "https://example.com/");
        titles.record("Home", "https://example.com/");

        let page = html_page(Some("Home"), Some("d"));
        assert!(classify(&page, "https://example.com/", &origin(), &titles).is_empty());
        assert_eq!(titles.len(), 1);
    }
}
