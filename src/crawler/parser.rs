//! HTML parser for extracting links and SEO metadata
//!
//! This module handles parsing HTML content to extract:
//! - Links to follow (from <a> tags), with their visible text
//! - Page title
//! - Meta description

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// A link found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundLink {
    /// Absolute URL the link points to
    pub url: String,

    /// Visible text of the anchor, whitespace-collapsed
    pub link_text: String,
}

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// The page description (from <meta name="description">)
    pub description: Option<String>,

    /// All links found on the page (absolute URLs)
    pub links: Vec<OutboundLink>,
}

/// Parses HTML content and extracts links and metadata
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links (same-page anchors)
///
/// # Example
///
/// ```
/// use site_auditor::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links[0].url, "https://example.com/page");
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        description: extract_description(&document),
        links: extract_links(&document, base_url),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

/// Extracts the meta description content
fn extract_description(document: &Html) -> Option<String> {
    let selector = Selector::parse("meta[name][content]").ok()?;

    document
        .select(&selector)
        .find(|element| {
            element
                .value()
                .attr("name")
                .map(|name| name.eq_ignore_ascii_case("description"))
                .unwrap_or(false)
        })
        .and_then(|element| element.value().attr("content"))
        .map(collapse_whitespace)
        .filter(|s| !s.is_empty())
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<OutboundLink> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                if let Some(url) = resolve_link(href, base_url) {
                    links.push(OutboundLink {
                        url,
                        link_text: link_text(&element),
                    });
                }
            }
        }
    }

    links
}

/// Visible anchor text, falling back to `aria-label`, `title` or an image's `alt`
fn link_text(element: &ElementRef<'_>) -> String {
    let text = collapse_whitespace(&element.text().collect::<String>());
    if !text.is_empty() {
        return text;
    }

    let attr = element
        .value()
        .attr("aria-label")
        .or_else(|| element.value().attr("title"));
    if let Some(label) = attr {
        return collapse_whitespace(label);
    }

    Selector::parse("img[alt]")
        .ok()
        .and_then(|img| {
            element
                .select(&img)
                .next()
                .and_then(|e| e.value().attr("alt"))
                .map(collapse_whitespace)
        })
        .unwrap_or_default()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if matches!(absolute_url.scheme(), "http" | "https") => {
            Some(absolute_url.to_string())
        }
        _ => None,
    }
}
