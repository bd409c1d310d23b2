//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end, from configuration file to report.

use site_auditor::config::{load_config, Config};
use site_auditor::crawler::{CrawlOrchestrator, CrawlOutcome, CrawlRequest, HttpFetcher};
use site_auditor::output::format_markdown_report;
use site_auditor::report::{load_dashboard, NavigationAction, ReportSelector};
use site_auditor::state::{CrawlStatus, SeoIssueType};
use site_auditor::storage::{SqliteStorage, Storage};
use std::io::Write;
use std::path::Path;
use tempfile::{NamedTempFile, TempDir};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Writes a configuration file pointing at a database inside `dir`
fn write_config(dir: &TempDir) -> NamedTempFile {
    let db_path = dir.path().join("audit.db");
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[crawler]
max-pages = 50
max-concurrent-fetches = 4
request-timeout-secs = 5

[user-agent]
crawler-name = "TestAuditor"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[storage]
database-path = "{}"
"#,
        db_path.display()
    )
    .unwrap();
    file
}

fn load(dir: &TempDir) -> Config {
    let file = write_config(dir);
    load_config(file.path()).unwrap()
}

fn orchestrator(config: &Config) -> CrawlOrchestrator<SqliteStorage, HttpFetcher> {
    let storage = SqliteStorage::new(Path::new(&config.storage.database_path)).unwrap();
    let fetcher =
        HttpFetcher::new(&config.user_agent, config.crawler.request_timeout()).unwrap();
    CrawlOrchestrator::new(storage, fetcher, config.crawler.clone())
}

fn html(title: &str, links: &[(&str, &str)]) -> String {
    let anchors: String = links
        .iter()
        .map(|(href, text)| format!(r#"<a href="{}">{}</a>"#, href, text))
        .collect();
    format!(
        r#"<html><head><title>{}</title><meta name="description" content="A test page"></head><body>{}</body></html>"#,
        title, anchors
    )
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

async fn crawl(config: &Config, url: &str) -> CrawlOutcome {
    orchestrator(config)
        .run(CrawlRequest::new(url))
        .await
        .expect("crawl should reach a terminal state")
}

#[tokio::test]
async fn test_end_to_end_broken_link() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", html("Home", &[("/about", "About us")])).await;
    mount_page(&server, "/about", html("About", &[("/missing", "Our history")])).await;
    // /missing is not mounted, so wiremock answers 404

    let dir = TempDir::new().unwrap();
    let config = load(&dir);
    let outcome = crawl(&config, &base).await;

    assert!(outcome.is_completed(), "crawl failed: {:?}", outcome.error);
    let crawl = &outcome.crawl;
    assert_eq!(crawl.pages_found, 3);
    assert_eq!(crawl.pages_crawled, 3);
    assert_eq!(crawl.findings.errors_404.len(), 1);

    let broken = &crawl.findings.errors_404[0];
    assert_eq!(broken.url, format!("{}/missing", base));
    assert_eq!(broken.source_page, format!("{}/about", base));
    assert_eq!(broken.link_text, "Our history");
    assert!(crawl.findings.redirects_301.is_empty());
    assert!(crawl.findings.seo_issues.is_empty());
}

#[tokio::test]
async fn test_user_agent_is_sent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header(
            "user-agent",
            "TestAuditor/1.0 (+https://example.com/about; admin@example.com)",
        ))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html("Home", &[]))
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = load(&dir);
    let outcome = crawl(&config, &server.uri()).await;

    // Without the right user agent the seed would 404
    assert!(outcome.crawl.findings.errors_404.is_empty());
}

#[tokio::test]
async fn test_duplicate_titles_and_missing_metadata() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        html("Home", &[("/home", "Home again"), ("/about", "About"), ("/bare", "Bare")]),
    )
    .await;
    mount_page(&server, "/home", html("Home", &[])).await;
    mount_page(&server, "/about", html("About", &[])).await;
    mount_page(
        &server,
        "/bare",
        "<html><head></head><body>No metadata</body></html>".to_string(),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = load(&dir);
    let outcome = crawl(&config, &base).await;
    let issues = &outcome.crawl.findings.seo_issues;

    let mut duplicates: Vec<String> = issues
        .iter()
        .filter(|i| i.issue_type == SeoIssueType::DuplicateTitle)
        .map(|i| i.url.clone())
        .collect();
    duplicates.sort();
    assert_eq!(duplicates, vec![format!("{}/", base), format!("{}/home", base)]);

    let bare: Vec<SeoIssueType> = issues
        .iter()
        .filter(|i| i.url == format!("{}/bare", base))
        .map(|i| i.issue_type)
        .collect();
    assert_eq!(
        bare,
        vec![SeoIssueType::MissingTitle, SeoIssueType::MissingDescription]
    );
    assert!(!issues.iter().any(|i| i.url == format!("{}/about", base)));
}

#[tokio::test]
async fn test_permanent_redirect_is_reported_and_followed() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", html("Home", &[("/old", "Old page")])).await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .mount(&server)
        .await;
    mount_page(&server, "/new", html("New", &[])).await;

    let dir = TempDir::new().unwrap();
    let config = load(&dir);
    let outcome = crawl(&config, &base).await;
    let crawl = &outcome.crawl;

    assert_eq!(crawl.pages_found, 3);
    assert_eq!(crawl.pages_crawled, 3);
    assert_eq!(crawl.findings.redirects_301.len(), 1);
    let redirect = &crawl.findings.redirects_301[0];
    assert_eq!(redirect.from_url, format!("{}/old", base));
    assert_eq!(redirect.to_url, format!("{}/new", base));
    assert_eq!(redirect.source_page, format!("{}/", base));
    assert!(crawl.findings.errors_404.is_empty());
}

#[tokio::test]
async fn test_non_html_pages_are_not_audited() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", html("Home", &[("/guide.pdf", "Guide")])).await;
    Mock::given(method("GET"))
        .and(path("/guide.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"%PDF-1.4".to_vec())
                .insert_header("content-type", "application/pdf"),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = load(&dir);
    let outcome = crawl(&config, &base).await;

    assert_eq!(outcome.crawl.pages_crawled, 2);
    assert!(outcome.crawl.findings.is_empty());
}

#[tokio::test]
async fn test_unreachable_site_fails_crawl() {
    // Grab a free port, then release it so nothing is listening there
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let dir = TempDir::new().unwrap();
    let config = load(&dir);
    let outcome = crawl(&config, &format!("http://127.0.0.1:{}/", port)).await;

    assert_eq!(outcome.crawl.status, CrawlStatus::Failed);
    assert!(outcome.error.is_some());
    assert!(outcome.crawl.findings.is_empty());

    let storage = SqliteStorage::new(Path::new(&config.storage.database_path)).unwrap();
    let website = storage.get_website(outcome.crawl.website_id).unwrap();
    assert_eq!(website.last_crawl_status, CrawlStatus::Failed);
}

#[tokio::test]
async fn test_history_persists_and_drives_reports() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", html("Home", &[("/gone", "Gone")])).await;

    let dir = TempDir::new().unwrap();
    let config = load(&dir);
    let first = crawl(&config, &base).await;
    let second = crawl(&config, &format!("{}/#top", base)).await;
    assert_eq!(first.crawl.website_id, second.crawl.website_id);

    // Reopen the database from disk
    let storage = SqliteStorage::new(Path::new(&config.storage.database_path)).unwrap();
    let websites = storage.list_websites(None).unwrap();
    let crawls = storage.list_crawls(None).unwrap();
    assert_eq!(websites.len(), 1);
    assert_eq!(crawls.len(), 2);
    assert_eq!(websites[0].last_crawl_status, CrawlStatus::Completed);

    let selector = ReportSelector::new(&crawls, &websites);
    let latest = selector.select(None);
    assert_eq!(latest.selection.crawl.map(|c| c.id), Some(second.crawl.id));
    assert_eq!(latest.navigation, NavigationAction::Rewrite(second.crawl.id));

    let stale = selector.select(Some("987654"));
    assert_eq!(stale.selection, latest.selection);

    let pinned = selector.select(Some(&first.crawl.id.to_string()));
    assert_eq!(pinned.selection.crawl.map(|c| c.id), Some(first.crawl.id));
    assert_eq!(pinned.navigation, NavigationAction::Keep);

    let dashboard = load_dashboard(&storage, &config.reports).unwrap();
    let totals = dashboard.totals();
    assert_eq!(totals.total_websites, 1);
    assert_eq!(totals.issues.errors_404, 2);
    let health = dashboard.health();
    assert_eq!(health.len(), 1);
    assert_eq!(health[0].score, 95);

    let markdown = format_markdown_report(&latest.selection).unwrap();
    assert!(markdown.contains(&format!("{}/gone", base)));
}
