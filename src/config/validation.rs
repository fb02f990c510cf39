use crate::config::types::{
    CacheConfig, Config, CrawlerConfig, OutputConfig, PublishConfig, ServerConfig,
    UserAgentConfig, ValidatorConfig,
};
use crate::ConfigError;
use std::net::SocketAddr;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_cache_config(&config.cache)?;
    validate_output_config(&config.output)?;
    validate_validator_config(&config.validator)?;
    validate_publish_config(&config.publish)?;
    validate_server_config(&config.server)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    Ok(())
}

fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "cache directory cannot be empty".to_string(),
        ));
    }

    if config.ttl_hours == 0 {
        return Err(ConfigError::Validation(
            "cache ttl_hours must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_validator_config(config: &ValidatorConfig) -> Result<(), ConfigError> {
    Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid validator endpoint: {}", e)))?;

    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "validator model cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates publish configuration
fn validate_publish_config(config: &PublishConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.repo_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid repo_url: {}", e)))?;

    if url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "repo_url '{}' must use HTTPS scheme",
            config.repo_url
        )));
    }

    if config.token_env.is_empty() {
        return Err(ConfigError::Validation(
            "token_env cannot be empty".to_string(),
        ));
    }

    validate_branch_prefix(&config.branch_prefix)?;

    if config.commit_message.trim().is_empty() {
        return Err(ConfigError::Validation(
            "commit_message cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Branch prefixes become part of a ref name
fn validate_branch_prefix(prefix: &str) -> Result<(), ConfigError> {
    if prefix.is_empty()
        || !prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/'))
        || prefix.starts_with('/')
        || prefix.ends_with('/')
    {
        return Err(ConfigError::Validation(format!(
            "branch_prefix '{}' is not a valid ref component",
            prefix
        )));
    }

    Ok(())
}

fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    config.bind.parse::<SocketAddr>().map_err(|e| {
        ConfigError::Validation(format!("Invalid bind address '{}': {}", config.bind, e))
    })?;

    for origin in &config.allowed_origins {
        Url::parse(origin)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid origin '{}': {}", origin, e)))?;
    }

    Ok(())
}
