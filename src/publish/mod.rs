//! Publishing generated files
//!
//! A run hands its whole artifact map to a [`Publisher`] exactly once, and only
//! when the map is non-empty. A publish failure fails the run.

mod git;

pub use git::GitPublisher;

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while publishing a batch
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Nothing to publish")]
    EmptyBatch,

    #[error("Publish token not set: {0}")]
    MissingToken(String),

    #[error("Invalid repository URL: {0}")]
    InvalidRepoUrl(String),

    #[error("Refusing to write outside the repository: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("git {command} failed: {stderr}")]
    Git { command: String, stderr: String },
}

/// Relative path to file content, committed as one unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishBatch {
    files: BTreeMap<String, String>,
    run_id: Option<String>,
}

impl PublishBatch {
    pub fn new(files: BTreeMap<String, String>) -> Self {
        Self {
            files,
            run_id: None,
        }
    }

    /// Tags the batch with the run that produced it
    pub fn for_run(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    /// Files in path order
    pub fn files(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Where a batch ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub branch: String,
}

/// Commits a batch of files somewhere durable
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, batch: &PublishBatch) -> Result<PublishReceipt, PublishError>;
}
