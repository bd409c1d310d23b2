//! Terminal rendering of dashboards and reports
//!
//! Rendering returns a `String` so it can be tested; the `print_*`
//! functions write that string to stdout.

use crate::output::format_date;
use crate::report::{ActiveCrawl, CrawlStats, Dashboard, Selection};
use std::fmt::Write;

/// Renders totals, health overview, active crawls and history
pub fn render_dashboard(dashboard: &Dashboard) -> String {
    let mut out = String::new();
    let totals = dashboard.totals();

    let _ = writeln!(out, "=== Crawl Dashboard ===\n");
    let _ = writeln!(out, "Overview:");
    let _ = writeln!(out, "  Websites monitored: {}", totals.total_websites);
    let _ = writeln!(out, "  404 errors found: {}", totals.issues.errors_404);
    let _ = writeln!(out, "  301 redirects found: {}", totals.issues.redirects_301);
    let _ = writeln!(out, "  SEO issues found: {}", totals.issues.seo_issues);
    let _ = writeln!(out);

    let health = dashboard.health();
    if !health.is_empty() {
        let _ = writeln!(out, "Website Health:");
        for entry in &health {
            let _ = writeln!(
                out,
                "  {} ({}): {}/100 [{}]",
                entry.name, entry.url, entry.score, entry.band
            );
        }
        let _ = writeln!(out);
    }

    let active = dashboard.active();
    if !active.is_empty() {
        out.push_str(&render_active_crawls(&active));
        let _ = writeln!(out);
    }

    let history = dashboard.history();
    let _ = writeln!(out, "Recent Crawls ({}):", history.len());
    if history.is_empty() {
        let _ = writeln!(out, "  No crawls yet");
    }
    for entry in history {
        let stats = entry.stats();
        let _ = writeln!(
            out,
            "  #{} {} [{}] {} - {} pages, {}",
            entry.crawl.id,
            entry.website.name,
            entry.crawl.status,
            format_date(&entry.crawl.created_date),
            entry.crawl.pages_crawled,
            issue_summary(&stats)
        );
    }

    out
}

/// Renders the progress of pending and crawling crawls
pub fn render_active_crawls(active: &[ActiveCrawl]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Active Crawls:");
    for crawl in active {
        let found = if crawl.pages_found > 0 {
            crawl.pages_found.to_string()
        } else {
            "?".to_string()
        };
        let _ = writeln!(
            out,
            "  #{} {} [{}] {} / {} pages ({:.0}%)",
            crawl.crawl_id, crawl.website_url, crawl.status, crawl.pages_crawled, found, crawl.percent
        );
    }
    out
}

/// Renders the selected report
pub fn render_report(selection: &Selection<'_>) -> String {
    let mut out = String::new();

    let Some(crawl) = selection.crawl else {
        let _ = writeln!(
            out,
            "No reports available: there are no completed crawls to report on."
        );
        return out;
    };

    let name = selection.website.map(|w| w.name.as_str()).unwrap_or("Unknown website");
    let stats = CrawlStats::of(crawl);

    let _ = writeln!(out, "=== Report: {} ===\n", name);
    let _ = writeln!(out, "  URL: {}", crawl.website_url);
    let _ = writeln!(out, "  Crawl: #{} on {}", crawl.id, format_date(&crawl.created_date));
    let _ = writeln!(
        out,
        "  Pages: {} found, {} crawled",
        crawl.pages_found, crawl.pages_crawled
    );
    let _ = writeln!(out, "  {}", issue_summary(&stats));
    let _ = writeln!(out);

    if !crawl.findings.errors_404.is_empty() {
        let _ = writeln!(out, "404 Errors:");
        for link in &crawl.findings.errors_404 {
            let _ = writeln!(
                out,
                "  {} (linked from {} as {:?})",
                link.url, link.source_page, link.link_text
            );
        }
        let _ = writeln!(out);
    }

    if !crawl.findings.redirects_301.is_empty() {
        let _ = writeln!(out, "301 Redirects:");
        for redirect in &crawl.findings.redirects_301 {
            let _ = writeln!(
                out,
                "  {} -> {} (linked from {})",
                redirect.from_url, redirect.to_url, redirect.source_page
            );
        }
        let _ = writeln!(out);
    }

    if !crawl.findings.seo_issues.is_empty() {
        let _ = writeln!(out, "SEO Issues:");
        for issue in &crawl.findings.seo_issues {
            let _ = writeln!(out, "  [{}] {}: {}", issue.issue_type, issue.url, issue.description);
        }
        let _ = writeln!(out);
    }

    if crawl.findings.is_empty() {
        let _ = writeln!(out, "No issues found.");
    }

    out
}

fn issue_summary(stats: &CrawlStats) -> String {
    format!(
        "{} broken, {} redirects, {} SEO",
        stats.errors_404, stats.redirects_301, stats.seo_issues
    )
}

pub fn print_dashboard(dashboard: &Dashboard) {
    print!("{}", render_dashboard(dashboard));
}

pub fn print_active_crawls(active: &[ActiveCrawl]) {
    print!("{}", render_active_crawls(active));
}

pub fn print_report(selection: &Selection<'_>) {
    print!("{}", render_report(selection));
}
