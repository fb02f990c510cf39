use serde::Deserialize;

/// Main configuration structure for Pomforge
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub validator: ValidatorConfig,
    pub publish: PublishConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Crawler behavior configuration
///
/// `max-pages` and `max-depth` have no defaults: every deployment has to state
/// how far a crawl may go.
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of URLs dequeued from the frontier in one run
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Maximum link distance from the start URL
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Per-request timeout for page fetches (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Whether robots.txt directives are honoured
    #[serde(rename = "respect-robots", default = "default_true")]
    pub respect_robots: bool,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

/// Analysis result cache configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cache_dir")]
    pub directory: String,
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: default_cache_dir(),
            ttl_hours: default_ttl_hours(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite page store
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Root directory for per-run reports and validation feedback
    pub directory: String,
}

/// Which validator checks generated test cases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorKind {
    /// Offline structural checks
    Rules,
    /// OpenAI-compatible chat completion review
    Chat,
}

/// Validator configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ValidatorConfig {
    #[serde(default = "default_validator_kind")]
    pub kind: ValidatorKind,
    #[serde(default = "default_chat_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_validator_timeout")]
    pub timeout_secs: u64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            kind: default_validator_kind(),
            endpoint: default_chat_endpoint(),
            model: default_chat_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_validator_timeout(),
        }
    }
}

/// Repository publishing configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PublishConfig {
    /// HTTPS URL of the repository receiving generated files
    pub repo_url: String,
    /// Environment variable holding the push token
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_branch_prefix")]
    pub branch_prefix: String,
    #[serde(default = "default_commit_message")]
    pub commit_message: String,
}

/// HTTP trigger configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

fn default_cache_dir() -> String {
    ".cache".to_string()
}

fn default_ttl_hours() -> u64 {
    24
}

fn default_validator_kind() -> ValidatorKind {
    ValidatorKind::Rules
}

fn default_chat_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_chat_model() -> String {
    "gpt-4".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_validator_timeout() -> u64 {
    60
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_branch_prefix() -> String {
    "auto-generated-tests".to_string()
}

fn default_commit_message() -> String {
    "Add auto-generated test cases and POMs".to_string()
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}
