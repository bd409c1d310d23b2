//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Site-Auditor database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Registered websites, one per normalized URL
CREATE TABLE IF NOT EXISTS websites (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    schedule TEXT NOT NULL,
    last_crawl_status TEXT NOT NULL,
    last_crawled_date TEXT,
    created_date TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_websites_created ON websites(created_date);

-- Append-only crawl history
CREATE TABLE IF NOT EXISTS crawls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    website_id INTEGER NOT NULL REFERENCES websites(id),
    website_url TEXT NOT NULL,
    status TEXT NOT NULL,
    pages_found INTEGER NOT NULL DEFAULT 0,
    pages_crawled INTEGER NOT NULL DEFAULT 0,
    errors_404 TEXT NOT NULL DEFAULT '[]',
    redirects_301 TEXT NOT NULL DEFAULT '[]',
    seo_issues TEXT NOT NULL DEFAULT '[]',
    created_date TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_crawls_created ON crawls(created_date);
CREATE INDEX IF NOT EXISTS idx_crawls_website ON crawls(website_id);
CREATE INDEX IF NOT EXISTS idx_crawls_status ON crawls(status);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
