//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{NewPage, PageRecord, RunCounts, RunRecord, RunStatus};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Storage lock poisoned")]
    Lock,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable record of fetched pages
///
/// Pages are keyed by URL and grouped by the origin id of the run that fetched
/// them. Callers treat every error here as non-fatal.
pub trait PageStore {
    /// Returns true if a page for `url` has already been stored
    fn already_crawled(&self, url: &str) -> StorageResult<bool>;

    /// Stores a fetched page, replacing any previous record for the same URL
    fn store_page(&mut self, page: NewPage<'_>) -> StorageResult<()>;

    /// Gets a page by URL
    fn get_page(&self, url: &str) -> StorageResult<Option<PageRecord>>;

    /// Lists the URLs stored under an origin, in the order they were stored
    fn page_urls_by_origin(&self, origin_id: &str) -> StorageResult<Vec<String>>;
}

/// Durable run state backing the status endpoint
pub trait RunStore {
    /// Records a new run in the `running` state
    fn create_run(&mut self, run_id: &str, start_url: &str, origin_id: &str)
        -> StorageResult<()>;

    /// Marks a run as finished with its final status and counters
    fn finish_run(
        &mut self,
        run_id: &str,
        status: RunStatus,
        counts: RunCounts,
        detail: Option<&str>,
    ) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: &str) -> StorageResult<Option<RunRecord>>;
}

/// Everything the orchestrator needs from persistence
pub trait Storage: PageStore + RunStore + Send {}

impl<T: PageStore + RunStore + Send> Storage for T {}

/// Storage shared between the HTTP trigger and background runs
pub type SharedStorage = Arc<Mutex<dyn Storage>>;

/// Locks shared storage, mapping a poisoned lock to [`StorageError::Lock`]
pub fn lock_storage(
    storage: &SharedStorage,
) -> StorageResult<MutexGuard<'_, dyn Storage + 'static>> {
    storage.lock().map_err(|_| StorageError::Lock)
}
