//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::{CrawlStatus, Findings};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    Crawl, CrawlId, CrawlUpdate, NewCrawl, NewWebsite, Website, WebsiteId, WebsiteUpdate,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;

const WEBSITE_COLUMNS: &str =
    "id, url, name, schedule, last_crawl_status, last_crawled_date, created_date";

const CRAWL_COLUMNS: &str = "id, website_id, website_url, status, pages_found, pages_crawled,
     errors_404, redirects_301, seo_issues, created_date";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) the database at `path` and applies the schema
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn query_crawls(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> StorageResult<Vec<Crawl>> {
        let mut stmt = self.conn.prepare(sql)?;
        let crawls = stmt
            .query_map(params, crawl_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(crawls)
    }

    /// Runs the partial crawl update, returning the number of rows changed
    fn write_crawl(&self, id: CrawlId, update: &CrawlUpdate, guard: &str) -> StorageResult<usize> {
        let (errors_404, redirects_301, seo_issues) = match &update.findings {
            Some(findings) => (
                Some(serde_json::to_string(&findings.errors_404)?),
                Some(serde_json::to_string(&findings.redirects_301)?),
                Some(serde_json::to_string(&findings.seo_issues)?),
            ),
            None => (None, None, None),
        };

        let changed = self.conn.execute(
            &format!(
                "UPDATE crawls SET
                    status = COALESCE(?1, status),
                    pages_found = COALESCE(?2, pages_found),
                    pages_crawled = COALESCE(?3, pages_crawled),
                    errors_404 = COALESCE(?4, errors_404),
                    redirects_301 = COALESCE(?5, redirects_301),
                    seo_issues = COALESCE(?6, seo_issues)
                 WHERE id = ?7{}",
                guard
            ),
            params![
                update.status.map(|s| s.to_db_string()),
                update.pages_found.map(|n| n as i64),
                update.pages_crawled.map(|n| n as i64),
                errors_404,
                redirects_301,
                seo_issues,
                id
            ],
        )?;

        Ok(changed)
    }
}

/// Formats a timestamp so that lexical order matches chronological order
fn format_timestamp(when: &DateTime<Utc>) -> String {
    when.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_status(value: &str) -> CrawlStatus {
    CrawlStatus::from_db_string(value).unwrap_or(CrawlStatus::Failed)
}

fn parse_json<T: serde::de::DeserializeOwned>(idx: usize, value: &str) -> rusqlite::Result<T> {
    serde_json::from_str(value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn website_from_row(row: &Row<'_>) -> rusqlite::Result<Website> {
    let last_crawled: Option<String> = row.get(5)?;
    Ok(Website {
        id: row.get(0)?,
        url: row.get(1)?,
        name: row.get(2)?,
        schedule: row.get(3)?,
        last_crawl_status: parse_status(&row.get::<_, String>(4)?),
        last_crawled_date: last_crawled
            .map(|value| parse_timestamp(5, &value))
            .transpose()?,
        created_date: parse_timestamp(6, &row.get::<_, String>(6)?)?,
    })
}

fn crawl_from_row(row: &Row<'_>) -> rusqlite::Result<Crawl> {
    Ok(Crawl {
        id: row.get(0)?,
        website_id: row.get(1)?,
        website_url: row.get(2)?,
        status: parse_status(&row.get::<_, String>(3)?),
        pages_found: row.get::<_, i64>(4)?.max(0) as u64,
        pages_crawled: row.get::<_, i64>(5)?.max(0) as u64,
        findings: Findings {
            errors_404: parse_json(6, &row.get::<_, String>(6)?)?,
            redirects_301: parse_json(7, &row.get::<_, String>(7)?)?,
            seo_issues: parse_json(8, &row.get::<_, String>(8)?)?,
        },
        created_date: parse_timestamp(9, &row.get::<_, String>(9)?)?,
    })
}

fn sql_limit(limit: Option<usize>) -> i64 {
    // SQLite treats a negative LIMIT as "no limit"
    limit.map(|l| l as i64).unwrap_or(-1)
}

impl Storage for SqliteStorage {
    // ===== Websites =====

    fn create_website(&mut self, website: &NewWebsite) -> StorageResult<Website> {
        let now = format_timestamp(&Utc::now());
        self.conn
            .execute(
                "INSERT INTO websites (url, name, schedule, last_crawl_status, created_date)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    website.url,
                    website.name,
                    website.schedule,
                    website.last_crawl_status.to_db_string(),
                    now
                ],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(ref err, _)
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    StorageError::ConstraintViolation(format!(
                        "website already registered: {}",
                        website.url
                    ))
                }
                other => StorageError::Sqlite(other),
            })?;

        self.get_website(self.conn.last_insert_rowid())
    }

    fn get_website(&self, id: WebsiteId) -> StorageResult<Website> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM websites WHERE id = ?1", WEBSITE_COLUMNS),
                params![id],
                website_from_row,
            )
            .optional()?
            .ok_or(StorageError::WebsiteNotFound(id))
    }

    fn find_website_by_url(&self, url: &str) -> StorageResult<Option<Website>> {
        let website = self
            .conn
            .query_row(
                &format!("SELECT {} FROM websites WHERE url = ?1", WEBSITE_COLUMNS),
                params![url],
                website_from_row,
            )
            .optional()?;
        Ok(website)
    }

    fn update_website(&mut self, id: WebsiteId, update: &WebsiteUpdate) -> StorageResult<Website> {
        let changed = self.conn.execute(
            "UPDATE websites SET
                name = COALESCE(?1, name),
                schedule = COALESCE(?2, schedule),
                last_crawl_status = COALESCE(?3, last_crawl_status),
                last_crawled_date = COALESCE(?4, last_crawled_date)
             WHERE id = ?5",
            params![
                update.name,
                update.schedule,
                update.last_crawl_status.map(|s| s.to_db_string()),
                update.last_crawled_date.as_ref().map(format_timestamp),
                id
            ],
        )?;

        if changed == 0 {
            return Err(StorageError::WebsiteNotFound(id));
        }
        self.get_website(id)
    }

    fn list_websites(&self, limit: Option<usize>) -> StorageResult<Vec<Website>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM websites ORDER BY created_date DESC, id DESC LIMIT ?1",
            WEBSITE_COLUMNS
        ))?;

        let websites = stmt
            .query_map(params![sql_limit(limit)], website_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(websites)
    }

    // ===== Crawls =====

    fn create_crawl(&mut self, crawl: &NewCrawl) -> StorageResult<Crawl> {
        let now = format_timestamp(&Utc::now());
        self.conn.execute(
            "INSERT INTO crawls (website_id, website_url, status, created_date)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                crawl.website_id,
                crawl.website_url,
                crawl.status.to_db_string(),
                now
            ],
        )?;

        self.get_crawl(self.conn.last_insert_rowid())
    }

    fn get_crawl(&self, id: CrawlId) -> StorageResult<Crawl> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM crawls WHERE id = ?1", CRAWL_COLUMNS),
                params![id],
                crawl_from_row,
            )
            .optional()?
            .ok_or(StorageError::CrawlNotFound(id))
    }

    fn update_crawl(&mut self, id: CrawlId, update: &CrawlUpdate) -> StorageResult<Crawl> {
        if self.write_crawl(id, update, "")? == 0 {
            return Err(StorageError::CrawlNotFound(id));
        }
        self.get_crawl(id)
    }

    fn advance_crawl(
        &mut self,
        id: CrawlId,
        update: &CrawlUpdate,
    ) -> StorageResult<Option<Crawl>> {
        if self.write_crawl(id, update, " AND status IN ('pending', 'crawling')")? == 0 {
            // Distinguishes a settled crawl from a missing one
            self.get_crawl(id)?;
            return Ok(None);
        }
        self.get_crawl(id).map(Some)
    }

    fn list_crawls(&self, limit: Option<usize>) -> StorageResult<Vec<Crawl>> {
        self.query_crawls(
            &format!(
                "SELECT {} FROM crawls ORDER BY created_date DESC, id DESC LIMIT ?1",
                CRAWL_COLUMNS
            ),
            params![sql_limit(limit)],
        )
    }

    fn list_crawls_for_website(
        &self,
        website_id: WebsiteId,
        limit: Option<usize>,
    ) -> StorageResult<Vec<Crawl>> {
        self.query_crawls(
            &format!(
                "SELECT {} FROM crawls WHERE website_id = ?1
                 ORDER BY created_date DESC, id DESC LIMIT ?2",
                CRAWL_COLUMNS
            ),
            params![website_id, sql_limit(limit)],
        )
    }
}
