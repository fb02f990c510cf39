//! Pomforge: crawl a website and forge Playwright page objects and tests for it
//!
//! This crate walks every same-domain page reachable from a start URL, runs each
//! stored page through an analysis pipeline (cached by content), and publishes the
//! generated page-object and test files to a git repository as a single batch.

pub mod analysis;
pub mod artifacts;
pub mod cache;
pub mod config;
pub mod crawler;
pub mod pipeline;
pub mod publish;
pub mod server;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Pomforge operations
#[derive(Debug, Error)]
pub enum PomforgeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] cache::CacheError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Publish error: {0}")]
    Publish(#[from] publish::PublishError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server error: {0}")]
    Server(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Pomforge operations
pub type Result<T> = std::result::Result<T, PomforgeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use pipeline::{process_website, RunOutcome, Services};
pub use url::{extract_domain, normalize_url, DomainScope};
