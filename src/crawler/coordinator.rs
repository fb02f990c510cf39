//! Crawler coordinator - main crawl loop
//!
//! Drains the frontier one URL at a time. For each URL it:
//! - skips the fetch when the page store already has the page, but still
//!   follows the stored page's links
//! - otherwise fetches the page, stores it, then enqueues its links
//! - logs and moves past fetch failures
//!
//! The loop is strictly sequential; the only suspension point is the fetch.

use crate::crawler::fetcher::PageFetcher;
use crate::crawler::frontier::{CrawlTask, Frontier};
use crate::crawler::parser::parse_html;
use crate::storage::{lock_storage, NewPage, PageStore, SharedStorage};

/// What a crawl produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// URLs to hand to the pipeline, in the order they were dequeued
    pub processable: Vec<String>,
    pub fetched: u32,
    /// Already in the page store, not refetched
    pub skipped_stored: u32,
    pub failed: u32,
}

impl CrawlReport {
    /// Pages that made it into (or were already in) the page store
    pub fn pages_crawled(&self) -> u32 {
        self.fetched + self.skipped_stored
    }
}

/// Runs one crawl against a page store
pub struct Coordinator<'a> {
    fetcher: &'a dyn PageFetcher,
    storage: &'a SharedStorage,
    origin_id: &'a str,
}

impl<'a> Coordinator<'a> {
    /// `origin_id` groups every page stored by this crawl
    pub fn new(
        fetcher: &'a dyn PageFetcher,
        storage: &'a SharedStorage,
        origin_id: &'a str,
    ) -> Self {
        Self {
            fetcher,
            storage,
            origin_id,
        }
    }

    /// Crawls until the frontier is exhausted
    pub async fn run(&self, frontier: &mut Frontier) -> CrawlReport {
        let mut report = CrawlReport::default();
        tracing::info!(
            "Starting crawl of {} (origin {})",
            frontier.scope().host(),
            self.origin_id
        );

        while let Ok(task) = frontier.next() {
            let url = task.url.as_str().to_string();

            if self.already_stored(&url) {
                tracing::info!("{} is already crawled, skipping fetch", url);
                report.skipped_stored += 1;
                report.processable.push(url.clone());
                self.follow_stored_links(frontier, &task, &url);
                continue;
            }

            tracing::debug!("Fetching {} (depth {})", url, task.depth);
            match self.fetcher.fetch(&task.url).await {
                Ok(page) => {
                    self.store(NewPage {
                        url: &url,
                        html: &page.html,
                        title: page.title.as_deref(),
                        origin_id: self.origin_id,
                    });
                    report.fetched += 1;
                    report.processable.push(url.clone());

                    let added = page
                        .internal_links
                        .iter()
                        .filter(|link| frontier.enqueue_link(link, task.depth))
                        .count();
                    tracing::debug!(
                        "Extracted {} links from {}, {} queued",
                        page.internal_links.len(),
                        url,
                        added
                    );
                }
                Err(e) => {
                    tracing::warn!("Error crawling {}: {}", url, e);
                    report.failed += 1;
                }
            }

            if frontier.dispatched() % 10 == 0 {
                tracing::info!(
                    "Progress: {} URLs dequeued, {} pending",
                    frontier.dispatched(),
                    frontier.pending()
                );
            }
        }

        tracing::info!(
            "Crawl finished: {} fetched, {} already stored, {} failed",
            report.fetched,
            report.skipped_stored,
            report.failed
        );
        report
    }

    /// A store read failure counts as "not stored"
    fn already_stored(&self, url: &str) -> bool {
        match lock_storage(self.storage).and_then(|store| store.already_crawled(url)) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("Could not check page store for {}: {}", url, e);
                false
            }
        }
    }

    fn store(&self, page: NewPage<'_>) {
        if let Err(e) = lock_storage(self.storage).and_then(|mut store| store.store_page(page)) {
            tracing::warn!("Failed to store {}: {}", page.url, e);
        }
    }

    fn follow_stored_links(&self, frontier: &mut Frontier, task: &CrawlTask, url: &str) {
        let html = match lock_storage(self.storage).and_then(|store| store.get_page(url)) {
            Ok(Some(record)) if record.has_html() => record.html,
            Ok(_) => return,
            Err(e) => {
                tracing::warn!("Could not read stored page {}: {}", url, e);
                return;
            }
        };

        for link in parse_html(&html, &task.url).links {
            frontier.enqueue_link(&link, task.depth);
        }
    }
}
