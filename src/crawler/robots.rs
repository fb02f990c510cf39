//! robots.txt gate
//!
//! Fetches `/robots.txt` once per origin for the lifetime of the fetcher and
//! answers allow/deny questions with the `robotstxt` matcher. A robots file
//! that is missing or unreachable allows everything.

use reqwest::Client;
use robotstxt::DefaultMatcher;
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

/// Parsed robots.txt data
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt content (empty string means allow all)
    content: String,
}

impl ParsedRobots {
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// Permissive rules, used when robots.txt can't be fetched
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
        }
    }

    /// Checks if `url` (absolute) may be fetched by `user_agent`
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }
}

/// Per-origin robots.txt cache
pub struct RobotsGate {
    agent: String,
    rules: Mutex<HashMap<String, ParsedRobots>>,
}

impl RobotsGate {
    /// `agent` is the product token matched against `User-agent` lines
    pub fn new(agent: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            rules: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true if `url` may be fetched, fetching robots.txt on first use
    pub async fn allows(&self, client: &Client, url: &Url) -> bool {
        let origin = url.origin().ascii_serialization();

        let cached = self
            .rules
            .lock()
            .ok()
            .and_then(|rules| rules.get(&origin).cloned());

        let robots = match cached {
            Some(robots) => robots,
            None => {
                let robots = fetch_robots(client, &origin).await;
                if let Ok(mut rules) = self.rules.lock() {
                    rules.insert(origin, robots.clone());
                }
                robots
            }
        };

        robots.is_allowed(url.as_str(), &self.agent)
    }
}

/// Fetches and parses robots.txt for an origin such as `https://x.test`
pub async fn fetch_robots(client: &Client, origin: &str) -> ParsedRobots {
    let robots_url = format!("{}/robots.txt", origin);

    let response = match client.get(&robots_url).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("Could not fetch {}: {}", robots_url, e);
            return ParsedRobots::allow_all();
        }
    };

    if !response.status().is_success() {
        tracing::debug!("{} returned {}", robots_url, response.status());
        return ParsedRobots::allow_all();
    }

    match response.text().await {
        Ok(body) => ParsedRobots::from_content(&body),
        Err(e) => {
            tracing::debug!("Could not read {}: {}", robots_url, e);
            ParsedRobots::allow_all()
        }
    }
}
