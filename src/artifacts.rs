//! Accumulates generated files for a run
//!
//! Paths are relative to the target repository root. The collector is owned by
//! a single run and turned into a [`PublishBatch`] once every URL is processed.

use crate::publish::PublishBatch;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct ArtifactCollector {
    files: BTreeMap<String, String>,
}

impl ArtifactCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a file; a second write to the same path replaces the first
    ///
    /// Returns true when an earlier file was overwritten.
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) -> bool {
        let path = path.into();
        let replaced = self.files.insert(path.clone(), content.into()).is_some();
        if replaced {
            tracing::warn!("Artifact {} was generated twice, keeping the latest", path);
        }
        replaced
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn into_batch(self) -> PublishBatch {
        PublishBatch::new(self.files)
    }
}
