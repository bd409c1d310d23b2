/// Crawl status definitions for tracking crawl lifecycle
///
/// This module defines the states a crawl record moves through from
/// submission to completion or failure.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current status of a crawl record
///
/// Status only ever advances forward:
///
/// ```text
/// pending -> crawling -> completed
///                    \-> failed
/// ```
///
/// A pending crawl may also move straight to `failed` when the traversal
/// never gets the chance to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlStatus {
    // ===== Active States =====
    /// Record exists, traversal not yet started
    Pending,

    /// Traversal in progress
    Crawling,

    // ===== Terminal States =====
    /// Traversal finished and findings were written
    Completed,

    /// Traversal could not produce a usable result
    Failed,
}

impl CrawlStatus {
    /// Returns true if this is a terminal state (no further transitions)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if the crawl is still in flight
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if moving from `self` to `next` is a legal forward transition
    pub fn can_transition_to(&self, next: CrawlStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Crawling)
                | (Self::Pending, Self::Failed)
                | (Self::Crawling, Self::Completed)
                | (Self::Crawling, Self::Failed)
        )
    }

    /// Converts the status to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Crawling => "crawling",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from a database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "crawling" => Some(Self::Crawling),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all possible statuses
    pub fn all_statuses() -> Vec<Self> {
        vec![Self::Pending, Self::Crawling, Self::Completed, Self::Failed]
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
