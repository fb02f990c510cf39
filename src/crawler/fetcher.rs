//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - The robots.txt gate
//! - GET requests to fetch page content
//! - Error classification

use crate::config::{Config, UserAgentConfig};
use crate::crawler::parser::parse_html;
use crate::crawler::robots::RobotsGate;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Why a page could not be fetched
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Disallowed by robots.txt")]
    RobotsDenied,

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Not an HTML page (Content-Type: {0})")]
    NotHtml(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,
    pub html: String,
    pub title: Option<String>,
    /// Absolute links found on the page, before scope filtering
    pub internal_links: Vec<String>,
}

/// Capability to fetch a page and report its links
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// The User-Agent is `Name/Version (+ContactURL)`. Redirects are followed.
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed fetcher with an optional robots.txt gate
pub struct HttpFetcher {
    client: Client,
    robots: Option<RobotsGate>,
}

impl HttpFetcher {
    pub fn new(client: Client, robots: Option<RobotsGate>) -> Self {
        Self { client, robots }
    }

    /// Builds the fetcher described by the `[crawler]` and `[user-agent]` sections
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.crawler.request_timeout_secs),
        )?;
        let robots = config
            .crawler
            .respect_robots
            .then(|| RobotsGate::new(config.user_agent.crawler_name.clone()));
        Ok(Self::new(client, robots))
    }
}

fn is_html(content_type: &str) -> bool {
    // Servers that omit the header are given the benefit of the doubt
    content_type.is_empty()
        || content_type.contains("text/html")
        || content_type.contains("application/xhtml")
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        if let Some(robots) = &self.robots {
            if !robots.allows(&self.client, url).await {
                return Err(FetchError::RobotsDenied);
            }
        }

        let response = self.client.get(url.as_str()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !is_html(&content_type) {
            return Err(FetchError::NotHtml(content_type));
        }

        let html = response.text().await?;
        let parsed = parse_html(&html, &final_url);

        Ok(FetchedPage {
            final_url,
            html,
            title: parsed.title,
            internal_links: parsed.links,
        })
    }
}
