//! Content-addressed result cache
//!
//! Analysis results are memoized on disk under `SHA-256(url ‖ html)`. Each key is
//! one JSON file `{ "timestamp": <ISO-8601>, "result": <payload> }`. Entries older
//! than the TTL are deleted by the read that finds them; nothing is updated in
//! place.
//!
//! Every cache failure degrades to a miss: the caller recomputes and the error is
//! only logged.

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by cache file I/O
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache entry is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cache entry has a bad timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
}

/// Hex-encoded SHA-256 over `url ‖ html`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize)]
struct EntryOut<'a, T> {
    timestamp: String,
    result: &'a T,
}

#[derive(Deserialize)]
struct EntryIn {
    timestamp: String,
    result: serde_json::Value,
}

/// On-disk TTL cache, one file per key
#[derive(Debug, Clone)]
pub struct ResultCache {
    dir: PathBuf,
    ttl: Duration,
}

impl ResultCache {
    /// Creates a cache rooted at `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    /// Cache with a TTL given in hours
    pub fn with_ttl_hours(dir: impl Into<PathBuf>, hours: u64) -> Self {
        let hours = i64::try_from(hours).unwrap_or(i64::MAX / 3_600_000);
        Self::new(dir, Duration::hours(hours))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Computes the cache key for a page
    pub fn key(url: &str, html: &str) -> CacheKey {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        hasher.update(html.as_bytes());
        CacheKey(hex::encode(hasher.finalize()))
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_str()))
    }

    /// Looks up a fresh entry
    pub fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        self.get_at(key, Utc::now())
    }

    /// Looks up an entry as of `now`
    ///
    /// Absent, corrupt and expired entries are all misses. An expired entry is
    /// removed.
    pub fn get_at<T: DeserializeOwned>(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<T> {
        let path = self.entry_path(key);
        if !path.exists() {
            return None;
        }

        match self.read_entry(&path, now) {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(result) => {
                    tracing::debug!("Cache hit for {}", key);
                    Some(result)
                }
                Err(e) => {
                    tracing::warn!("Cached result for {} has the wrong shape: {}", key, e);
                    None
                }
            },
            Ok(None) => {
                tracing::debug!("Cache entry {} expired", key);
                if let Err(e) = fs::remove_file(&path) {
                    tracing::warn!("Failed to remove expired cache entry {}: {}", key, e);
                }
                None
            }
            Err(e) => {
                tracing::warn!("Failed to read cache entry {}: {}", key, e);
                None
            }
        }
    }

    /// Returns `Ok(None)` when the entry is past its TTL
    fn read_entry(
        &self,
        path: &Path,
        now: DateTime<Utc>,
    ) -> Result<Option<serde_json::Value>, CacheError> {
        let raw = fs::read_to_string(path)?;
        let entry: EntryIn = serde_json::from_str(&raw)?;
        let stored_at = DateTime::parse_from_rfc3339(&entry.timestamp)?.with_timezone(&Utc);

        if now - stored_at > self.ttl {
            return Ok(None);
        }
        Ok(Some(entry.result))
    }

    /// Stores a payload with the current time
    pub fn put<T: Serialize>(&self, key: &CacheKey, result: &T) -> Result<(), CacheError> {
        self.put_at(key, result, Utc::now())
    }

    /// Stores a payload stamped with `now`, overwriting any previous entry
    pub fn put_at<T: Serialize>(
        &self,
        key: &CacheKey,
        result: &T,
        now: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;
        let entry = EntryOut {
            timestamp: now.to_rfc3339(),
            result,
        };
        let json = serde_json::to_string(&entry)?;
        fs::write(self.entry_path(key), json)?;
        tracing::debug!("Cached result under {}", key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache_in(dir: &Path) -> ResultCache {
        ResultCache::with_ttl_hours(dir.join("cache"), 24)
    }

    #[test]
    fn test_key_is_sha256_hex() {
        let key = ResultCache::key("https://x.test/", "<html></html>");
        assert_eq!(key.as_str().len(), 64);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key, ResultCache::key("https://x.test/", "<html></html>"));
    }

    #[test]
    fn test_html_change_changes_key() {
        let a = ResultCache::key("https://x.test/", "<p>a</p>");
        let b = ResultCache::key("https://x.test/", "<p>b</p>");
        assert_ne!(a, b);
    }

    #[test]
    fn test_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let key = ResultCache::key("https://x.test/", "<html></html>");

        cache.put(&key, &json!({"pomCode": "class A {}"})).unwrap();
        let hit: Option<serde_json::Value> = cache.get(&key);
        assert_eq!(hit, Some(json!({"pomCode": "class A {}"})));
    }

    #[test]
    fn test_absent_entry_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let key = ResultCache::key("https://x.test/", "");
        assert!(cache.get::<serde_json::Value>(&key).is_none());
    }

    #[test]
    fn test_expired_entry_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let key = ResultCache::key("https://x.test/", "<html></html>");
        let written = Utc::now() - Duration::hours(25);

        cache.put_at(&key, &json!(1), written).unwrap();
        let path = cache.entry_path(&key);
        assert!(path.exists());

        assert!(cache.get::<serde_json::Value>(&key).is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_entry_within_ttl_survives() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let key = ResultCache::key("https://x.test/", "<html></html>");
        let written = Utc::now() - Duration::hours(23);

        cache.put_at(&key, &json!(1), written).unwrap();
        assert_eq!(cache.get::<serde_json::Value>(&key), Some(json!(1)));
    }

    #[test]
    fn test_corrupt_entry_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let key = ResultCache::key("https://x.test/", "<html></html>");

        fs::create_dir_all(cache.dir()).unwrap();
        fs::write(cache.entry_path(&key), "{not json").unwrap();
        assert!(cache.get::<serde_json::Value>(&key).is_none());
    }

    #[test]
    fn test_entry_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let key = ResultCache::key("https://x.test/", "<html></html>");
        cache.put(&key, &json!({"testCases": []})).unwrap();

        let raw = fs::read_to_string(cache.entry_path(&key)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value["timestamp"].is_string());
        assert_eq!(value["result"], json!({"testCases": []}));
    }
}
