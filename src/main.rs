//! Pomforge main entry point
//!
//! Serves the HTTP trigger by default; `--url` runs a single crawl in the
//! foreground instead.

use anyhow::{bail, Context};
use clap::Parser;
use pomforge::config::{load_config_with_hash, Config, ValidatorKind};
use pomforge::pipeline::{process_website, RunSettings, Services};
use pomforge::server::{serve, AppState};
use pomforge::storage::{open_shared_storage, RunStore};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Pomforge: Playwright page objects and tests for a whole site
///
/// Pomforge crawls every same-domain page reachable from a start URL,
/// generates a page-object class and a test file per page, and pushes the
/// result to a git repository on a fresh branch.
#[derive(Parser, Debug)]
#[command(name = "pomforge")]
#[command(version)]
#[command(about = "Crawl a site and forge Playwright tests for it", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Process this start URL once and exit instead of serving
    #[arg(long, value_name = "URL", conflicts_with_all = ["dry_run", "status"])]
    url: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what a run would use, without running
    #[arg(long, conflicts_with = "status")]
    dry_run: bool,

    /// Print the stored record of a run and exit
    #[arg(long, value_name = "RUN_ID")]
    status: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    if let Some(run_id) = cli.status.as_deref() {
        return handle_status(&config, run_id);
    }

    let services = Services::from_config(&config).context("failed to initialize services")?;
    let settings = RunSettings::from_config(&config);

    match cli.url {
        Some(url) => handle_run(&services, &settings, &url).await,
        None => {
            let state = AppState { services, settings };
            serve(state, &config.server)
                .await
                .context("HTTP server stopped")
        }
    }
}

const DEFAULT_LOG_FILTER: &str = "pomforge=info,warn";

/// Picks filter directives; `RUST_LOG` only applies when no -v/-q flag is given
fn log_directives(verbose: u8, quiet: bool, rust_log: Option<String>) -> String {
    if quiet {
        return "error".to_string();
    }
    match verbose {
        0 => rust_log
            .filter(|directives| !directives.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        1 => "pomforge=debug,tower_http=debug,info".to_string(),
        2 => "pomforge=trace,debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directives = log_directives(verbose, quiet, rust_log);
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|e| {
        eprintln!("Ignoring invalid log filter {:?}: {}", directives, e);
        EnvFilter::new(DEFAULT_LOG_FILTER)
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Pomforge Dry Run ===\n");

    println!("Crawler:");
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Respect robots.txt: {}", config.crawler.respect_robots);
    println!("  User-Agent: {}", config.user_agent.header_value());

    println!("\nCache:");
    if config.cache.enabled {
        println!("  {} (TTL {}h)", config.cache.directory, config.cache.ttl_hours);
    } else {
        println!("  disabled");
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Reports: {}", config.output.directory);

    println!("\nValidator:");
    match config.validator.kind {
        ValidatorKind::Rules => println!("  built-in rules"),
        ValidatorKind::Chat => println!(
            "  {} via {} (key from ${})",
            config.validator.model, config.validator.endpoint, config.validator.api_key_env
        ),
    }

    println!("\nPublish:");
    println!("  Repository: {}", config.publish.repo_url);
    println!("  Branch prefix: {}", config.publish.branch_prefix);
    println!("  Token from: ${}", config.publish.token_env);

    println!("\nServer:");
    println!("  Bind: {}", config.server.bind);
    println!("  Allowed origins: {}", config.server.allowed_origins.join(", "));

    println!("\n✓ Configuration is valid");
}

/// Handles the --status mode: prints a stored run as JSON
fn handle_status(config: &Config, run_id: &str) -> anyhow::Result<()> {
    let storage = open_shared_storage(Path::new(&config.output.database_path))?;
    let run = storage
        .lock()
        .map_err(|_| anyhow::anyhow!("storage lock poisoned"))?
        .get_run(run_id)?;

    match run {
        Some(run) => {
            println!("{}", serde_json::to_string_pretty(&run)?);
            Ok(())
        }
        None => bail!("no run with id {}", run_id),
    }
}

/// Handles a foreground run of a single start URL
async fn handle_run(
    services: &Services,
    settings: &RunSettings,
    url: &str,
) -> anyhow::Result<()> {
    let outcome = process_website(services, settings, url)
        .await
        .with_context(|| format!("run for {} failed", url))?;

    println!("Run {}: {:?}", outcome.run_id, outcome.status);
    println!("  Pages crawled: {}", outcome.counts.pages_crawled);
    println!("  Pages processed: {}", outcome.counts.pages_processed);
    println!("  Files generated: {}", outcome.counts.artifacts);
    println!("  Reports: {}", outcome.output_dir.display());
    if let Some(branch) = &outcome.branch {
        println!("  Published to branch: {}", branch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_log_used_without_flags() {
        assert_eq!(
            log_directives(0, false, Some("pomforge=trace".to_string())),
            "pomforge=trace"
        );
        assert_eq!(log_directives(0, false, None), DEFAULT_LOG_FILTER);
        assert_eq!(log_directives(0, false, Some("  ".to_string())), DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_flags_override_rust_log() {
        let env = || Some("pomforge=trace".to_string());
        assert_eq!(log_directives(0, true, env()), "error");
        assert_eq!(
            log_directives(1, false, env()),
            "pomforge=debug,tower_http=debug,info"
        );
        assert_eq!(log_directives(3, false, env()), "trace");
    }

    #[test]
    fn test_cli_parses_run_flags() {
        let cli = Cli::try_parse_from(["pomforge", "pomforge.toml", "--url", "https://x.test/"])
            .unwrap();
        assert_eq!(cli.url.as_deref(), Some("https://x.test/"));
        assert!(!cli.dry_run);

        assert!(Cli::try_parse_from(["pomforge", "c.toml", "--url", "u", "--dry-run"]).is_err());
        assert!(Cli::try_parse_from(["pomforge", "c.toml", "-v", "-q"]).is_err());
    }
}
