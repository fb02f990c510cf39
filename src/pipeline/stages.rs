//! Per-URL pipeline stages
//!
//! Each stage returns `Result<_, StageFailure>`. The orchestrator stops a URL at
//! the first failure and moves on to the next one.

use crate::analysis::{
    AnalysisError, PageAnalyzer, PipelineResult, TestCase, TestValidator, ValidationError,
};
use crate::artifacts::ArtifactCollector;
use crate::cache::ResultCache;
use crate::pipeline::codegen::generate_test_code;
use crate::pipeline::paths::ArtifactPaths;
use crate::pipeline::report::{write_feedback, ReportError};
use crate::storage::{lock_storage, PageRecord, PageStore, SharedStorage, StorageError};
use std::fmt;
use std::path::Path;
use thiserror::Error;
use url::Url;

/// Pipeline stage names, used in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    Analyze,
    Normalize,
    Validate,
    Generate,
    Emit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolve => "resolve",
            Self::Analyze => "analyze",
            Self::Normalize => "normalize",
            Self::Validate => "validate",
            Self::Generate => "generate",
            Self::Emit => "emit",
        };
        f.write_str(name)
    }
}

/// Why a URL left the pipeline early
#[derive(Debug, Error)]
pub enum StageFailure {
    #[error("no stored page")]
    NoRecord,

    #[error("stored page has no HTML")]
    EmptyHtml,

    #[error("page store read failed: {0}")]
    Store(#[from] StorageError),

    #[error("stored URL is invalid: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("{0}")]
    Analysis(#[from] AnalysisError),

    #[error("analyzer reported an error: {0}")]
    AnalysisMarker(String),

    #[error("analysis result has no test cases or no page object")]
    Incomplete,

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("could not write feedback: {0}")]
    Feedback(ReportError),

    #[error("could not write reports: {0}")]
    Report(ReportError),
}

impl StageFailure {
    /// Stage the failure belongs to
    pub fn stage(&self) -> Stage {
        match self {
            Self::NoRecord | Self::EmptyHtml | Self::Store(_) | Self::InvalidUrl(_) => {
                Stage::Resolve
            }
            Self::Analysis(_) | Self::AnalysisMarker(_) | Self::Incomplete => Stage::Analyze,
            Self::Validation(_) | Self::Feedback(_) => Stage::Validate,
            Self::Report(_) => Stage::Emit,
        }
    }
}

/// Stored page plus its parsed URL
#[derive(Debug)]
pub struct ResolvedPage {
    pub url: Url,
    pub record: PageRecord,
}

/// Reads the page record for `url` from the page store
pub fn resolve(storage: &SharedStorage, url: &str) -> Result<ResolvedPage, StageFailure> {
    let record = lock_storage(storage)
        .and_then(|store| store.get_page(url))?
        .ok_or(StageFailure::NoRecord)?;

    if !record.has_html() {
        return Err(StageFailure::EmptyHtml);
    }

    Ok(ResolvedPage {
        url: Url::parse(&record.url)?,
        record,
    })
}

/// Runs the analyzer, consulting the result cache when one is given
///
/// Only complete results without an error marker are cached. Cache faults never
/// fail the stage: a bad read is a miss and a failed write is logged.
pub async fn analyze(
    analyzer: &dyn PageAnalyzer,
    cache: Option<&ResultCache>,
    html: &str,
    url: &str,
) -> Result<PipelineResult, StageFailure> {
    let key = cache.map(|_| ResultCache::key(url, html));

    if let (Some(cache), Some(key)) = (cache, key.as_ref()) {
        match cache.get::<PipelineResult>(key) {
            Some(hit) if hit.error.is_none() && hit.is_complete() => {
                tracing::info!("Cache hit for {}", url);
                return Ok(hit);
            }
            Some(_) => tracing::debug!("Ignoring unusable cache entry for {}", url),
            None => tracing::debug!("Cache miss for {}", url),
        }
    }

    let result = analyzer.analyze(html, url).await?;

    if let Some(marker) = &result.error {
        return Err(StageFailure::AnalysisMarker(marker.clone()));
    }
    if !result.is_complete() {
        return Err(StageFailure::Incomplete);
    }

    if let (Some(cache), Some(key)) = (cache, key.as_ref()) {
        if let Err(e) = cache.put(key, &result) {
            tracing::error!("Failed to cache analysis of {}: {}", url, e);
        }
    }

    Ok(result)
}

/// Fills defaults every later stage relies on
pub fn normalize(test_cases: &mut [TestCase]) {
    for tc in test_cases.iter_mut() {
        tc.normalize();
    }
}

/// Reviews the cases and writes the feedback next to the run's reports
pub async fn validate(
    validator: &dyn TestValidator,
    test_cases: &[TestCase],
    pom_code: &str,
    feedback_path: &Path,
) -> Result<String, StageFailure> {
    let feedback = validator.validate(test_cases, pom_code).await?;
    write_feedback(feedback_path, &feedback).map_err(StageFailure::Feedback)?;
    tracing::debug!("Wrote validation feedback to {}", feedback_path.display());
    Ok(feedback)
}

/// Registers the page object and its generated tests with the collector
pub fn generate(
    collector: &mut ArtifactCollector,
    paths: &ArtifactPaths,
    page_url: &Url,
    result: &PipelineResult,
) {
    let test_code = generate_test_code(
        &result.test_cases,
        &result.pom_code,
        page_url,
        &paths.pom_import(),
    );
    collector.insert(paths.pom_file.clone(), result.pom_code.clone());
    collector.insert(paths.test_file.clone(), test_code);
}
