//! URL handling module for Site-Auditor
//!
//! This module provides URL normalization and host extraction used to build
//! the traversal's visited-set and to keep the crawl on the seed's site.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{extract_host, is_same_site, site_host, site_key};
pub use normalize::normalize_url;
