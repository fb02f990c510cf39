//! Crawler module for discovering pages on a site
//!
//! This module contains the crawling side of a run:
//! - The breadth-first frontier with domain scope and hard limits
//! - HTTP fetching behind the [`PageFetcher`] trait, with a robots.txt gate
//! - HTML parsing and link extraction
//! - The crawl loop that ties these to the page store

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod robots;

pub use coordinator::{Coordinator, CrawlReport};
pub use fetcher::{build_http_client, FetchError, FetchedPage, HttpFetcher, PageFetcher};
pub use frontier::{CrawlTask, Frontier, FrontierError, FrontierLimits};
pub use parser::{parse_html, ParsedPage};
pub use robots::{fetch_robots, ParsedRobots, RobotsGate};
