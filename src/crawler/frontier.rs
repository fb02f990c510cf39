//! Breadth-first crawl frontier
//!
//! Holds the FIFO queue of pending URLs together with the queued and visited
//! sets for one run. A URL is admitted only if it is in the start URL's
//! domain scope, within the depth limit, and neither queued nor visited. At
//! most `max_pages` URLs are ever handed out.

use crate::config::CrawlerConfig;
use crate::url::{normalize_url, DomainScope};
use crate::UrlError;
use std::collections::{HashSet, VecDeque};
use thiserror::Error;
use url::Url;

/// Raised by [`Frontier::next`] when the crawl is over
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrontierError {
    #[error("frontier exhausted")]
    Exhausted,
}

/// A URL awaiting visitation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    pub url: Url,
    /// Link distance from the start URL
    pub depth: u32,
}

/// Hard stops for a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontierLimits {
    pub max_pages: u32,
    pub max_depth: u32,
}

impl From<&CrawlerConfig> for FrontierLimits {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            max_pages: config.max_pages,
            max_depth: config.max_depth,
        }
    }
}

#[derive(Debug)]
pub struct Frontier {
    scope: DomainScope,
    limits: FrontierLimits,
    queue: VecDeque<CrawlTask>,
    queued: HashSet<String>,
    visited: HashSet<String>,
    dispatched: u32,
}

impl Frontier {
    /// Creates a frontier seeded with the normalized start URL at depth 0
    ///
    /// # Errors
    ///
    /// Fails if the start URL can't be normalized or has no host.
    pub fn new(start_url: &str, limits: FrontierLimits) -> Result<Self, UrlError> {
        let start = normalize_url(start_url)?;
        let scope = DomainScope::from_url(&start)?;

        let mut frontier = Self {
            scope,
            limits,
            queue: VecDeque::new(),
            queued: HashSet::new(),
            visited: HashSet::new(),
            dispatched: 0,
        };
        frontier.enqueue(start, 0);
        Ok(frontier)
    }

    pub fn scope(&self) -> &DomainScope {
        &self.scope
    }

    /// Adds `url` to the tail of the queue
    ///
    /// Returns false, without error, when the URL is out of scope, deeper than
    /// `max_depth`, or already queued or visited.
    pub fn enqueue(&mut self, url: Url, depth: u32) -> bool {
        if depth > self.limits.max_depth || !self.scope.contains(&url) {
            return false;
        }

        let key = url.as_str();
        if self.visited.contains(key) || self.queued.contains(key) {
            return false;
        }

        self.queued.insert(key.to_string());
        self.queue.push_back(CrawlTask { url, depth });
        true
    }

    /// Normalizes a discovered link and enqueues it one level below its parent
    pub fn enqueue_link(&mut self, link: &str, parent_depth: u32) -> bool {
        match normalize_url(link) {
            Ok(url) => self.enqueue(url, parent_depth.saturating_add(1)),
            Err(e) => {
                tracing::trace!("Dropping link {}: {}", link, e);
                false
            }
        }
    }

    /// Pops the next unvisited URL and marks it visited
    pub fn next(&mut self) -> Result<CrawlTask, FrontierError> {
        if self.dispatched >= self.limits.max_pages {
            return Err(FrontierError::Exhausted);
        }

        while let Some(task) = self.queue.pop_front() {
            let key = task.url.as_str();
            self.queued.remove(key);
            if !self.visited.insert(key.to_string()) {
                continue;
            }

            self.dispatched += 1;
            return Ok(task);
        }

        Err(FrontierError::Exhausted)
    }

    pub fn is_visited(&self, url: &Url) -> bool {
        self.visited.contains(url.as_str())
    }

    /// Number of URLs handed out so far
    pub fn dispatched(&self) -> u32 {
        self.dispatched
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(max_pages: u32, max_depth: u32) -> FrontierLimits {
        FrontierLimits {
            max_pages,
            max_depth,
        }
    }

    fn url(s: &str) -> Url {
        normalize_url(s).unwrap()
    }

    #[test]
    fn test_start_url_is_first() {
        let mut frontier = Frontier::new("https://x.test/", limits(10, 3)).unwrap();
        let task = frontier.next().unwrap();
        assert_eq!(task.url.as_str(), "https://x.test/");
        assert_eq!(task.depth, 0);
        assert_eq!(frontier.next(), Err(FrontierError::Exhausted));
    }

    #[test]
    fn test_invalid_start_url() {
        assert!(Frontier::new("not a url", limits(10, 3)).is_err());
        assert!(Frontier::new("ftp://x.test/", limits(10, 3)).is_err());
    }

    #[test]
    fn test_fifo_order() {
        let mut frontier = Frontier::new("https://x.test/", limits(10, 3)).unwrap();
        frontier.next().unwrap();
        assert!(frontier.enqueue_link("https://x.test/b", 0));
        assert!(frontier.enqueue_link("https://x.test/a", 0));

        assert_eq!(frontier.next().unwrap().url.as_str(), "https://x.test/b");
        assert_eq!(frontier.next().unwrap().url.as_str(), "https://x.test/a");
    }

    #[test]
    fn test_out_of_scope_dropped() {
        let mut frontier = Frontier::new("https://x.test/", limits(10, 3)).unwrap();
        assert!(!frontier.enqueue(url("https://other.test/"), 1));
        assert!(!frontier.enqueue(url("https://sub.x.test/"), 1));
        assert!(!frontier.enqueue(url("https://x.test:8443/"), 1));
        assert_eq!(frontier.pending(), 1);
    }

    #[test]
    fn test_duplicates_dropped() {
        let mut frontier = Frontier::new("https://x.test/", limits(10, 3)).unwrap();
        assert!(!frontier.enqueue(url("https://x.test/"), 1));

        frontier.next().unwrap();
        // visited now, still rejected
        assert!(!frontier.enqueue(url("https://x.test/"), 1));

        assert!(frontier.enqueue_link("https://x.test/a#top", 0));
        assert!(!frontier.enqueue_link("https://x.test/a/", 0));
        assert_eq!(frontier.pending(), 1);
    }

    #[test]
    fn test_depth_limit() {
        let mut frontier = Frontier::new("https://x.test/", limits(10, 1)).unwrap();
        assert!(frontier.enqueue_link("https://x.test/one", 0));
        assert!(!frontier.enqueue_link("https://x.test/two", 1));
    }

    #[test]
    fn test_max_pages_stops_dispatch() {
        let mut frontier = Frontier::new("https://x.test/", limits(2, 5)).unwrap();
        frontier.enqueue_link("https://x.test/a", 0);
        frontier.enqueue_link("https://x.test/b", 0);

        assert!(frontier.next().is_ok());
        assert!(frontier.next().is_ok());
        assert_eq!(frontier.next(), Err(FrontierError::Exhausted));
        assert_eq!(frontier.dispatched(), 2);
        assert_eq!(frontier.pending(), 1);
    }

    #[test]
    fn test_next_marks_visited() {
        let mut frontier = Frontier::new("https://x.test/", limits(10, 3)).unwrap();
        let task = frontier.next().unwrap();
        assert!(frontier.is_visited(&task.url));
    }
}
