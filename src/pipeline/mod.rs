//! Run orchestration
//!
//! A run crawls the site from its start URL, pushes every processable URL
//! through the stages in [`stages`], and publishes whatever was generated as a
//! single batch. A URL that fails a stage is logged and skipped; only an
//! unusable start URL or a failed publish fails the run.

pub mod codegen;
pub mod paths;
pub mod report;
pub mod stages;

pub use paths::{ArtifactPaths, PathAllocator};
pub use report::{ReportError, RunReport};
pub use stages::{Stage, StageFailure};

use crate::analysis::{
    ChatValidator, HeuristicAnalyzer, PageAnalyzer, RuleValidator, TestValidator,
};
use crate::artifacts::ArtifactCollector;
use crate::cache::ResultCache;
use crate::config::{Config, ValidatorKind};
use crate::crawler::{Coordinator, Frontier, FrontierLimits, HttpFetcher, PageFetcher};
use crate::publish::{GitPublisher, Publisher};
use crate::storage::{
    lock_storage, open_shared_storage, PageStore, RunCounts, RunStatus, RunStore, SharedStorage,
};
use crate::url::{normalize_url, output_namespace};
use crate::{ConfigError, PomforgeError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Long-lived handles shared by every run in the process
#[derive(Clone)]
pub struct Services {
    pub storage: SharedStorage,
    pub fetcher: Arc<dyn PageFetcher>,
    pub analyzer: Arc<dyn PageAnalyzer>,
    pub validator: Arc<dyn TestValidator>,
    pub publisher: Arc<dyn Publisher>,
    pub cache: ResultCache,
}

impl Services {
    /// Opens the page store and builds every client the configuration names
    pub fn from_config(config: &Config) -> Result<Self, PomforgeError> {
        let storage = open_shared_storage(Path::new(&config.output.database_path))?;
        let fetcher = HttpFetcher::from_config(config)?;

        let validator: Arc<dyn TestValidator> = match config.validator.kind {
            ValidatorKind::Rules => Arc::new(RuleValidator::new()),
            ValidatorKind::Chat => Arc::new(
                ChatValidator::from_config(&config.validator)
                    .map_err(|e| ConfigError::Validation(e.to_string()))?,
            ),
        };

        Ok(Self {
            storage,
            fetcher: Arc::new(fetcher),
            analyzer: Arc::new(HeuristicAnalyzer::new()),
            validator,
            publisher: Arc::new(GitPublisher::from_config(&config.publish)?),
            cache: ResultCache::with_ttl_hours(&config.cache.directory, config.cache.ttl_hours),
        })
    }
}

/// Per-run knobs taken from configuration
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub limits: FrontierLimits,
    /// Parent of the per-run output directories
    pub output_root: PathBuf,
    pub use_cache: bool,
}

impl RunSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            limits: FrontierLimits::from(&config.crawler),
            output_root: PathBuf::from(&config.output.directory),
            use_cache: config.cache.enabled,
        }
    }
}

/// How a finished run turned out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub run_id: String,
    pub status: RunStatus,
    pub counts: RunCounts,
    /// Branch the batch was pushed to, when something was published
    pub branch: Option<String>,
    pub output_dir: PathBuf,
}

/// Crawls `start_url`, generates tests for every page and publishes them
///
/// Creates the run record, then behaves like [`execute_run`].
pub async fn process_website(
    services: &Services,
    settings: &RunSettings,
    start_url: &str,
) -> Result<RunOutcome, PomforgeError> {
    let run_id = start_run(services, start_url)?;
    execute_run(services, settings, &run_id, start_url).await
}

/// Records a new run in the `running` state and returns its id
///
/// The run id doubles as the origin id of every page the crawl stores.
pub fn start_run(services: &Services, start_url: &str) -> Result<String, PomforgeError> {
    let run_id = Uuid::new_v4().to_string();
    lock_storage(&services.storage)
        .and_then(|mut store| store.create_run(&run_id, start_url, &run_id))?;
    tracing::info!("Run {} created for {}", run_id, start_url);
    Ok(run_id)
}

/// Runs a previously created run to completion and records how it ended
pub async fn execute_run(
    services: &Services,
    settings: &RunSettings,
    run_id: &str,
    start_url: &str,
) -> Result<RunOutcome, PomforgeError> {
    let mut counts = RunCounts::default();
    let result = drive(services, settings, run_id, start_url, &mut counts).await;

    let (status, detail) = match &result {
        Ok(outcome) => (outcome.status, outcome.branch.clone()),
        Err(e) => {
            tracing::error!("Run {} failed: {}", run_id, e);
            (RunStatus::Failed, Some(e.to_string()))
        }
    };

    if let Err(e) = lock_storage(&services.storage)
        .and_then(|mut store| store.finish_run(run_id, status, counts, detail.as_deref()))
    {
        tracing::error!("Could not record the end of run {}: {}", run_id, e);
    }

    result
}

async fn drive(
    services: &Services,
    settings: &RunSettings,
    run_id: &str,
    start_url: &str,
    counts: &mut RunCounts,
) -> Result<RunOutcome, PomforgeError> {
    let mut frontier = Frontier::new(start_url, settings.limits)?;

    let crawl = Coordinator::new(services.fetcher.as_ref(), &services.storage, run_id)
        .run(&mut frontier)
        .await;
    counts.pages_crawled = crawl.pages_crawled();

    let mut urls = crawl.processable;
    if urls.is_empty() {
        urls = origin_fallback(&services.storage, start_url);
    }

    let output_dir = settings.output_root.join(output_namespace(start_url));
    let mut outcome = RunOutcome {
        run_id: run_id.to_string(),
        status: RunStatus::Completed,
        counts: *counts,
        branch: None,
        output_dir: output_dir.clone(),
    };

    if urls.is_empty() {
        tracing::info!("No URLs to process for {}", start_url);
        return Ok(outcome);
    }

    let mut run = UrlPipeline {
        services,
        cache: settings.use_cache.then_some(&services.cache),
        paths: PathAllocator::new(),
        collector: ArtifactCollector::new(),
        report: RunReport::new(&output_dir),
    };

    tracing::info!("Processing {} URLs from {}", urls.len(), start_url);
    for url in &urls {
        match run.process(url).await {
            Ok(()) => counts.pages_processed += 1,
            Err(failure) => tracing::warn!(
                "Skipping {} at {} stage: {}",
                url,
                failure.stage(),
                failure
            ),
        }
    }

    counts.artifacts = u32::try_from(run.collector.len()).unwrap_or(u32::MAX);
    outcome.counts = *counts;

    if run.collector.is_empty() {
        tracing::info!("No files were generated for {}, nothing to publish", start_url);
        return Ok(outcome);
    }

    let batch = run.collector.into_batch().for_run(run_id);
    let receipt = services.publisher.publish(&batch).await?;
    tracing::info!(
        "Run {} published {} files to {}",
        run_id,
        counts.artifacts,
        receipt.branch
    );
    outcome.status = RunStatus::Published;
    outcome.branch = Some(receipt.branch);
    Ok(outcome)
}

/// URLs recorded under the origin of the start URL's stored page
fn origin_fallback(storage: &SharedStorage, start_url: &str) -> Vec<String> {
    let key = normalize_url(start_url)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| start_url.to_string());

    let lookup = lock_storage(storage).and_then(|store| match store.get_page(&key)? {
        Some(record) => store.page_urls_by_origin(&record.origin_id),
        None => Ok(Vec::new()),
    });

    match lookup {
        Ok(urls) => {
            if !urls.is_empty() {
                tracing::info!(
                    "Crawl yielded nothing new, falling back to {} stored URLs for {}",
                    urls.len(),
                    start_url
                );
            }
            urls
        }
        Err(e) => {
            tracing::warn!("Origin lookup for {} failed: {}", start_url, e);
            Vec::new()
        }
    }
}

/// State owned by one run while its URLs go through the stages
struct UrlPipeline<'a> {
    services: &'a Services,
    cache: Option<&'a ResultCache>,
    paths: PathAllocator,
    collector: ArtifactCollector,
    report: RunReport,
}

impl UrlPipeline<'_> {
    async fn process(&mut self, url: &str) -> Result<(), StageFailure> {
        let page = stages::resolve(&self.services.storage, url)?;

        let mut result = stages::analyze(
            self.services.analyzer.as_ref(),
            self.cache,
            &page.record.html,
            url,
        )
        .await?;

        stages::normalize(&mut result.test_cases);

        let paths = self.paths.allocate(&page.url);
        let feedback_path = self.report.dir().join(paths.feedback_file());
        stages::validate(
            self.services.validator.as_ref(),
            &result.test_cases,
            &result.pom_code,
            &feedback_path,
        )
        .await?;

        stages::generate(&mut self.collector, &paths, &page.url, &result);

        self.report
            .record(url, &result.test_cases)
            .map_err(StageFailure::Report)?;

        tracing::info!(
            "Generated {} test cases for {}",
            result.test_cases.len(),
            url
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{NewPage, PageStore, SqliteStorage};
    use std::sync::Mutex;

    fn page<'a>(url: &'a str, origin_id: &'a str) -> NewPage<'a> {
        NewPage {
            url,
            html: "<html></html>",
            title: None,
            origin_id,
        }
    }

    #[test]
    fn test_origin_fallback_lists_origin_pages() {
        let mut store = SqliteStorage::new_in_memory().unwrap();
        store.store_page(page("https://x.test/", "run-1")).unwrap();
        store.store_page(page("https://x.test/a", "run-1")).unwrap();
        store.store_page(page("https://y.test/", "run-2")).unwrap();
        let storage: SharedStorage = Arc::new(Mutex::new(store));

        let urls = origin_fallback(&storage, "https://x.test");
        assert_eq!(urls, vec!["https://x.test/", "https://x.test/a"]);
    }

    #[test]
    fn test_origin_fallback_unknown_start() {
        let storage: SharedStorage = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));
        assert!(origin_fallback(&storage, "https://nowhere.test/").is_empty());
    }
}
