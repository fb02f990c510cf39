//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Pomforge database.

use rusqlite::Connection;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Fetched pages, one row per URL
CREATE TABLE IF NOT EXISTS pages (
    url TEXT PRIMARY KEY,
    html TEXT NOT NULL,
    title TEXT,
    origin_id TEXT NOT NULL,
    stored_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pages_origin ON pages(origin_id);

-- Crawl-and-generate runs
CREATE TABLE IF NOT EXISTS runs (
    id TEXT PRIMARY KEY,
    start_url TEXT NOT NULL,
    origin_id TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    pages_crawled INTEGER NOT NULL DEFAULT 0,
    pages_processed INTEGER NOT NULL DEFAULT 0,
    artifacts INTEGER NOT NULL DEFAULT 0,
    detail TEXT
);
"#;

/// Creates all tables and indexes if they don't exist
pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
