use url::Url;

/// Extracts the host from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (which shouldn't happen for valid HTTP(S) URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_auditor::url::extract_host;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_host(&url), Some("example.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Host used for same-site comparisons: lowercase, without a leading `www.`
pub fn site_host(url: &Url) -> Option<String> {
    extract_host(url).map(|host| match host.strip_prefix("www.") {
        Some(bare) => bare.to_string(),
        None => host,
    })
}

/// Returns true if `candidate` lives on the same site as `seed`
///
/// `www.example.com` and `example.com` are treated as the same site;
/// any other subdomain is a different site.
pub fn is_same_site(seed: &Url, candidate: &Url) -> bool {
    match (site_host(seed), site_host(candidate)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Identity of a page within its site: the URL with its host replaced by
/// `site_host`, so `www.` and bare spellings of one page share a key
pub fn site_key(url: &Url) -> String {
    let mut key = url.clone();
    if let Some(host) = site_host(url) {
        if key.set_host(Some(&host)).is_err() {
            return url.to_string();
        }
    }
    key.to_string()
}
