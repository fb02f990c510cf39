//! Configuration module for Pomforge
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use pomforge::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("pomforge.toml")).unwrap();
//! println!("Crawler will visit at most {} pages", config.crawler.max_pages);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    CacheConfig, Config, CrawlerConfig, OutputConfig, PublishConfig, ServerConfig,
    UserAgentConfig, ValidatorConfig, ValidatorKind,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
