use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigResult;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Reads, parses and validates the auditor configuration at `path`
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use site_auditor::config::load_config;
///
/// let config = load_config(Path::new("auditor.toml")).unwrap();
/// println!("Page budget: {}", config.crawler.max_pages);
/// ```
pub fn load_config(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration text
///
/// Missing `[reports]` settings fall back to their defaults; the
/// `[crawler]`, `[user-agent]` and `[storage]` tables are required.
pub fn parse_config(content: &str) -> ConfigResult<Config> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Hex SHA-256 of the configuration text, logged so a crawl can be tied to
/// the settings that produced it
pub fn config_fingerprint(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Loads the configuration and fingerprints the exact bytes that were parsed
pub fn load_config_with_fingerprint(path: &Path) -> ConfigResult<(Config, String)> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, config_fingerprint(&content)))
}
