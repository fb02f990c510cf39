//! Integration tests for whole runs
//!
//! These tests serve small sites with wiremock and drive full runs through
//! `process_website`, with a recording publisher and a counting analyzer
//! injected through `Services`.

use async_trait::async_trait;
use pomforge::analysis::{
    AnalysisError, HeuristicAnalyzer, PageAnalyzer, PipelineResult, RuleValidator, TestCase,
    TestValidator, ValidationError,
};
use pomforge::cache::ResultCache;
use pomforge::crawler::{build_http_client, FrontierLimits, HttpFetcher};
use pomforge::config::UserAgentConfig;
use pomforge::pipeline::{process_website, RunSettings, Services};
use pomforge::publish::{PublishBatch, PublishError, PublishReceipt, Publisher};
use pomforge::storage::{RunStatus, RunStore, SharedStorage, SqliteStorage};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Publisher that remembers every batch it was handed
#[derive(Default)]
struct RecordingPublisher {
    batches: Mutex<Vec<PublishBatch>>,
    fail: bool,
}

impl RecordingPublisher {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn batches(&self) -> Vec<PublishBatch> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, batch: &PublishBatch) -> Result<PublishReceipt, PublishError> {
        self.batches.lock().unwrap().push(batch.clone());
        if self.fail {
            return Err(PublishError::Git {
                command: "push".to_string(),
                stderr: "remote rejected".to_string(),
            });
        }
        Ok(PublishReceipt {
            branch: "auto-generated-tests-1".to_string(),
        })
    }
}

/// Heuristic analysis that counts calls and fails for chosen paths
struct CountingAnalyzer {
    calls: AtomicUsize,
    fail_paths: Vec<&'static str>,
    inner: HeuristicAnalyzer,
}

impl CountingAnalyzer {
    fn new(fail_paths: Vec<&'static str>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_paths,
            inner: HeuristicAnalyzer::new(),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageAnalyzer for CountingAnalyzer {
    async fn analyze(&self, html: &str, url: &str) -> Result<PipelineResult, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_paths.iter().any(|p| url.ends_with(p)) {
            return Err(AnalysisError::Failed(format!("refusing {}", url)));
        }
        self.inner.analyze(html, url).await
    }
}

/// Rule validation, except for page objects of one class
struct RejectingValidator {
    class: &'static str,
    inner: RuleValidator,
}

#[async_trait]
impl TestValidator for RejectingValidator {
    async fn validate(
        &self,
        test_cases: &[TestCase],
        pom_code: &str,
    ) -> Result<String, ValidationError> {
        if pom_code.contains(&format!("class {} ", self.class)) {
            return Err(ValidationError::RequestFailed("validator unavailable".to_string()));
        }
        self.inner.validate(test_cases, pom_code).await
    }
}

struct Harness {
    services: Services,
    settings: RunSettings,
    analyzer: Arc<CountingAnalyzer>,
    publisher: Arc<RecordingPublisher>,
}

fn harness(
    dir: &Path,
    storage: SharedStorage,
    analyzer: CountingAnalyzer,
    publisher: RecordingPublisher,
    use_cache: bool,
) -> Harness {
    let user_agent = UserAgentConfig {
        crawler_name: "pomforge".to_string(),
        crawler_version: "0.1".to_string(),
        contact_url: "https://example.com/bot".to_string(),
    };
    let client = build_http_client(&user_agent, Duration::from_secs(5)).unwrap();
    let analyzer = Arc::new(analyzer);
    let publisher = Arc::new(publisher);

    Harness {
        services: Services {
            storage,
            fetcher: Arc::new(HttpFetcher::new(client, None)),
            analyzer: analyzer.clone(),
            validator: Arc::new(RuleValidator::new()),
            publisher: publisher.clone(),
            cache: ResultCache::with_ttl_hours(dir.join("cache"), 24),
        },
        settings: RunSettings {
            limits: FrontierLimits {
                max_pages: 20,
                max_depth: 3,
            },
            output_root: dir.join("outputs"),
            use_cache,
        },
        analyzer,
        publisher,
    }
}

fn memory_storage() -> SharedStorage {
    Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()))
}

fn html_page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><head><title>t</title></head><body>{}</body></html>", body),
        "text/html",
    )
}

async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

/// `/` links to `/about` and to another domain; `/about` has a form
async fn small_site() -> MockServer {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        html_page(
            "<nav><a href=\"/about\">About</a></nav>\
             <a href=\"https://y.test/\">Elsewhere</a>\
             <img src=\"/logo.png\" alt=\"Logo\">",
        ),
    )
    .await;
    mount(
        &server,
        "/about",
        html_page(
            "<a href=\"/\">Home</a>\
             <form action=\"/contact\"><input name=\"email\" type=\"email\">\
             <button type=\"submit\">Send</button></form>",
        ),
    )
    .await;
    server
}

fn requested_paths(requests: &[wiremock::Request]) -> Vec<String> {
    let mut paths: Vec<String> = requests.iter().map(|r| r.url.path().to_string()).collect();
    paths.sort();
    paths
}

#[tokio::test]
async fn test_run_crawls_same_domain_and_publishes_once() {
    let server = small_site().await;
    let dir = tempfile::tempdir().unwrap();
    let h = harness(
        dir.path(),
        memory_storage(),
        CountingAnalyzer::new(vec![]),
        RecordingPublisher::default(),
        false,
    );

    let outcome = process_website(&h.services, &h.settings, &format!("{}/", server.uri()))
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Published);
    assert_eq!(outcome.branch.as_deref(), Some("auto-generated-tests-1"));
    assert_eq!(outcome.counts.pages_crawled, 2);
    assert_eq!(outcome.counts.pages_processed, 2);
    assert_eq!(outcome.counts.artifacts, 4);

    // each page fetched exactly once, the other domain never
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requested_paths(&requests), vec!["/", "/about"]);

    let batches = h.publisher.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].run_id(), Some(outcome.run_id.as_str()));
    let files: Vec<&str> = batches[0].files().map(|(p, _)| p).collect();
    assert_eq!(
        files,
        vec![
            "pages/about.page.ts",
            "pages/home.page.ts",
            "tests/about.test.ts",
            "tests/home.test.ts"
        ]
    );

    let (_, home_test) = batches[0]
        .files()
        .find(|(p, _)| *p == "tests/home.test.ts")
        .unwrap();
    assert!(home_test.contains("import { HomePage } from '../pages/home.page';"));
    assert!(home_test.contains("test('Navigation Menu Accessibility'"));

    let run = h
        .services
        .storage
        .lock()
        .unwrap()
        .get_run(&outcome.run_id)
        .unwrap()
        .unwrap();
    assert_eq!(run.status, RunStatus::Published);
    assert_eq!(run.pages_processed, 2);
}

#[tokio::test]
async fn test_run_writes_reports_and_feedback() {
    let server = small_site().await;
    let dir = tempfile::tempdir().unwrap();
    let h = harness(
        dir.path(),
        memory_storage(),
        CountingAnalyzer::new(vec![]),
        RecordingPublisher::default(),
        false,
    );

    let outcome = process_website(&h.services, &h.settings, &format!("{}/", server.uri()))
        .await
        .unwrap();

    let out = &outcome.output_dir;
    assert!(out.starts_with(dir.path().join("outputs")));

    let listing: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.join("test_cases.json")).unwrap())
            .unwrap();
    let cases = listing["testCases"].as_array().unwrap();
    assert!(!cases.is_empty());
    assert!(cases.iter().all(|c| c["preconditions"].is_string()));
    assert!(cases.iter().all(|c| c["edgeCases"].is_array()));

    let summary = std::fs::read_to_string(out.join("test_cases.md")).unwrap();
    assert!(summary.contains("| Title | Preconditions | Steps | Expected Results | Edge Cases |"));
    assert!(summary.contains("Form 1 Validation"));

    for slug in ["home", "about"] {
        let feedback =
            std::fs::read_to_string(out.join(format!("validation_feedback_{}.txt", slug)))
                .unwrap();
        assert!(!feedback.trim().is_empty());
    }
}

#[tokio::test]
async fn test_stored_pages_are_processed_without_refetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("<nav><a href=\"/about\">About</a></nav>"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html_page("<nav><a href=\"/\">Home</a></nav>"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let storage = memory_storage();
    let start = format!("{}/", server.uri());

    let first = harness(
        dir.path(),
        storage.clone(),
        CountingAnalyzer::new(vec![]),
        RecordingPublisher::default(),
        false,
    );
    process_website(&first.services, &first.settings, &start)
        .await
        .unwrap();

    let second = harness(
        dir.path(),
        storage,
        CountingAnalyzer::new(vec![]),
        RecordingPublisher::default(),
        false,
    );
    let outcome = process_website(&second.services, &second.settings, &start)
        .await
        .unwrap();

    // both pages reached through stored links, processed and published again
    assert_eq!(outcome.counts.pages_processed, 2);
    assert_eq!(outcome.status, RunStatus::Published);
    assert_eq!(second.analyzer.calls(), 2);
    assert_eq!(second.publisher.batches().len(), 1);
}

#[tokio::test]
async fn test_cached_analysis_is_reused() {
    let server = small_site().await;
    let dir = tempfile::tempdir().unwrap();
    let storage = memory_storage();
    let start = format!("{}/", server.uri());

    let h = harness(
        dir.path(),
        storage,
        CountingAnalyzer::new(vec![]),
        RecordingPublisher::default(),
        true,
    );

    process_website(&h.services, &h.settings, &start).await.unwrap();
    assert_eq!(h.analyzer.calls(), 2);

    // same stored html, so every page is a cache hit
    let outcome = process_website(&h.services, &h.settings, &start).await.unwrap();
    assert_eq!(h.analyzer.calls(), 2);
    assert_eq!(outcome.counts.pages_processed, 2);
    assert_eq!(h.publisher.batches().len(), 2);
    let batches = h.publisher.batches();
    assert_eq!(
        batches[0].files().collect::<Vec<_>>(),
        batches[1].files().collect::<Vec<_>>()
    );
    assert_ne!(batches[0].run_id(), batches[1].run_id());
}

#[tokio::test]
async fn test_empty_page_is_skipped_others_proceed() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        html_page("<nav><a href=\"/blank\">Blank</a><a href=\"/about\">About</a></nav>"),
    )
    .await;
    mount(
        &server,
        "/blank",
        ResponseTemplate::new(200).set_body_raw("", "text/html"),
    )
    .await;
    mount(&server, "/about", html_page("<nav><a href=\"/\">Home</a></nav>")).await;

    let dir = tempfile::tempdir().unwrap();
    let h = harness(
        dir.path(),
        memory_storage(),
        CountingAnalyzer::new(vec![]),
        RecordingPublisher::default(),
        false,
    );

    let outcome = process_website(&h.services, &h.settings, &format!("{}/", server.uri()))
        .await
        .unwrap();

    assert_eq!(outcome.counts.pages_crawled, 3);
    assert_eq!(outcome.counts.pages_processed, 2);
    // the blank page never reached analysis
    assert_eq!(h.analyzer.calls(), 2);

    let batch = &h.publisher.batches()[0];
    assert!(batch.files().all(|(p, _)| !p.contains("blank")));
    assert!(batch.files().any(|(p, _)| p == "pages/about.page.ts"));
}

#[tokio::test]
async fn test_analysis_failure_is_isolated() {
    let server = small_site().await;
    let dir = tempfile::tempdir().unwrap();
    let h = harness(
        dir.path(),
        memory_storage(),
        CountingAnalyzer::new(vec!["/about"]),
        RecordingPublisher::default(),
        false,
    );

    let outcome = process_website(&h.services, &h.settings, &format!("{}/", server.uri()))
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Published);
    assert_eq!(outcome.counts.pages_processed, 1);

    let batch = &h.publisher.batches()[0];
    let files: Vec<&str> = batch.files().map(|(p, _)| p).collect();
    assert_eq!(files, vec!["pages/home.page.ts", "tests/home.test.ts"]);
}

#[tokio::test]
async fn test_validation_failure_is_isolated() {
    let server = small_site().await;
    let dir = tempfile::tempdir().unwrap();
    let mut h = harness(
        dir.path(),
        memory_storage(),
        CountingAnalyzer::new(vec![]),
        RecordingPublisher::default(),
        false,
    );
    h.services.validator = Arc::new(RejectingValidator {
        class: "AboutPage",
        inner: RuleValidator::new(),
    });

    let outcome = process_website(&h.services, &h.settings, &format!("{}/", server.uri()))
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Published);
    assert_eq!(h.analyzer.calls(), 2);
    assert_eq!(outcome.counts.pages_processed, 1);
    assert_eq!(outcome.counts.artifacts, 2);

    let batches = h.publisher.batches();
    assert_eq!(batches.len(), 1);
    let files: Vec<&str> = batches[0].files().map(|(p, _)| p).collect();
    assert_eq!(files, vec!["pages/home.page.ts", "tests/home.test.ts"]);

    let out = &outcome.output_dir;
    assert!(out.join("validation_feedback_home.txt").exists());
    assert!(!out.join("validation_feedback_about.txt").exists());
}

#[tokio::test]
async fn test_nothing_generated_means_no_publish() {
    let server = small_site().await;
    let dir = tempfile::tempdir().unwrap();
    let h = harness(
        dir.path(),
        memory_storage(),
        CountingAnalyzer::new(vec!["/", "/about"]),
        RecordingPublisher::default(),
        false,
    );

    let outcome = process_website(&h.services, &h.settings, &format!("{}/", server.uri()))
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.counts.artifacts, 0);
    assert!(h.publisher.batches().is_empty());
}

#[tokio::test]
async fn test_unreachable_site_completes_without_publish() {
    let server = MockServer::start().await;
    mount(&server, "/", ResponseTemplate::new(500)).await;

    let dir = tempfile::tempdir().unwrap();
    let h = harness(
        dir.path(),
        memory_storage(),
        CountingAnalyzer::new(vec![]),
        RecordingPublisher::default(),
        false,
    );

    let outcome = process_website(&h.services, &h.settings, &format!("{}/", server.uri()))
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.counts.pages_crawled, 0);
    assert_eq!(h.analyzer.calls(), 0);
    assert!(h.publisher.batches().is_empty());
}

#[tokio::test]
async fn test_publish_failure_fails_the_run() {
    let server = small_site().await;
    let dir = tempfile::tempdir().unwrap();
    let h = harness(
        dir.path(),
        memory_storage(),
        CountingAnalyzer::new(vec![]),
        RecordingPublisher::failing(),
        false,
    );

    let start = format!("{}/", server.uri());
    let result = process_website(&h.services, &h.settings, &start).await;
    assert!(matches!(result, Err(pomforge::PomforgeError::Publish(_))));
    assert_eq!(h.publisher.batches().len(), 1);
}

#[tokio::test]
async fn test_invalid_start_url_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(
        dir.path(),
        memory_storage(),
        CountingAnalyzer::new(vec![]),
        RecordingPublisher::default(),
        false,
    );

    let result = process_website(&h.services, &h.settings, "not a url").await;
    assert!(matches!(result, Err(pomforge::PomforgeError::UrlError(_))));
    assert!(h.publisher.batches().is_empty());
}
