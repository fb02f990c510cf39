//! Storage module for persisting crawl data
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - The page store: fetched HTML keyed by URL, grouped by crawl origin
//! - Run tracking, so a fire-and-forget run can still be inspected later

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{
    lock_storage, PageStore, RunStore, SharedStorage, Storage, StorageError, StorageResult,
};

use crate::PomforgeError;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Opens (or creates) the SQLite store and wraps it for sharing between runs
pub fn open_shared_storage(path: &Path) -> Result<SharedStorage, PomforgeError> {
    let storage = SqliteStorage::new(path)?;
    Ok(Arc::new(Mutex::new(storage)))
}

/// A fetched page as recorded in the page store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub url: String,
    pub html: String,
    pub title: Option<String>,
    pub origin_id: String,
    pub stored_at: String,
}

impl PageRecord {
    /// Returns true if the record carries usable HTML
    pub fn has_html(&self) -> bool {
        !self.html.trim().is_empty()
    }
}

/// A page about to be stored
#[derive(Debug, Clone, Copy)]
pub struct NewPage<'a> {
    pub url: &'a str,
    pub html: &'a str,
    pub title: Option<&'a str>,
    pub origin_id: &'a str,
}

/// Represents a crawl-and-generate run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub id: String,
    pub start_url: String,
    pub origin_id: String,
    pub status: RunStatus,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub pages_crawled: u32,
    pub pages_processed: u32,
    pub artifacts: u32,
    pub detail: Option<String>,
}

/// Counters recorded when a run finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub pages_crawled: u32,
    pub pages_processed: u32,
    pub artifacts: u32,
}

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    /// Finished without anything to publish
    Completed,
    /// Finished and the batch was pushed
    Published,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Published => "published",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "published" => Some(Self::Published),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns true once the run can no longer change
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_roundtrip() {
        for status in &[
            RunStatus::Running,
            RunStatus::Completed,
            RunStatus::Published,
            RunStatus::Failed,
        ] {
            let parsed = RunStatus::from_db_string(status.to_db_string());
            assert_eq!(Some(*status), parsed);
        }
    }

    #[test]
    fn test_run_status_invalid() {
        assert_eq!(RunStatus::from_db_string("invalid"), None);
    }

    #[test]
    fn test_page_record_without_html() {
        let record = PageRecord {
            url: "https://x.test/".to_string(),
            html: "  \n".to_string(),
            title: None,
            origin_id: "o".to_string(),
            stored_at: "now".to_string(),
        };
        assert!(!record.has_html());
    }
}
