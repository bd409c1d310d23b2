//! Configuration module for Site-Auditor
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use site_auditor::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("auditor.toml")).unwrap();
//! println!("Crawler will visit at most {} pages", config.crawler.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, ReportsConfig, StorageConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{config_fingerprint, load_config, load_config_with_fingerprint, parse_config};
