//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the storage traits.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{PageStore, RunStore, StorageError, StorageResult};
use crate::storage::{NewPage, PageRecord, RunCounts, RunRecord, RunStatus};
use crate::PomforgeError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(PomforgeError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, PomforgeError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, PomforgeError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<PageRecord> {
    Ok(PageRecord {
        url: row.get(0)?,
        html: row.get(1)?,
        title: row.get(2)?,
        origin_id: row.get(3)?,
        stored_at: row.get(4)?,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        start_url: row.get(1)?,
        origin_id: row.get(2)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(3)?)
            .unwrap_or(RunStatus::Failed),
        started_at: row.get(4)?,
        finished_at: row.get(5)?,
        pages_crawled: row.get(6)?,
        pages_processed: row.get(7)?,
        artifacts: row.get(8)?,
        detail: row.get(9)?,
    })
}

impl PageStore for SqliteStorage {
    fn already_crawled(&self, url: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM pages WHERE url = ?1", params![url], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    fn store_page(&mut self, page: NewPage<'_>) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO pages (url, html, title, origin_id, stored_at) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(url) DO UPDATE SET html = excluded.html, title = excluded.title,
             origin_id = excluded.origin_id, stored_at = excluded.stored_at",
            params![page.url, page.html, page.title, page.origin_id, now],
        )?;
        Ok(())
    }

    fn get_page(&self, url: &str) -> StorageResult<Option<PageRecord>> {
        let page = self
            .conn
            .query_row(
                "SELECT url, html, title, origin_id, stored_at FROM pages WHERE url = ?1",
                params![url],
                page_from_row,
            )
            .optional()?;
        Ok(page)
    }

    fn page_urls_by_origin(&self, origin_id: &str) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT url FROM pages WHERE origin_id = ?1 ORDER BY rowid ASC")?;

        let urls = stmt
            .query_map(params![origin_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(urls)
    }
}

impl RunStore for SqliteStorage {
    fn create_run(
        &mut self,
        run_id: &str,
        start_url: &str,
        origin_id: &str,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (id, start_url, origin_id, status, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![run_id, start_url, origin_id, RunStatus::Running.to_db_string(), now],
        )?;
        Ok(())
    }

    fn finish_run(
        &mut self,
        run_id: &str,
        status: RunStatus,
        counts: RunCounts,
        detail: Option<&str>,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, pages_crawled = ?3,
             pages_processed = ?4, artifacts = ?5, detail = ?6 WHERE id = ?7",
            params![
                status.to_db_string(),
                now,
                counts.pages_crawled,
                counts.pages_processed,
                counts.artifacts,
                detail,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id.to_string()));
        }
        Ok(())
    }

    fn get_run(&self, run_id: &str) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, start_url, origin_id, status, started_at, finished_at,
                 pages_crawled, pages_processed, artifacts, detail FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }
}
