use serde::Deserialize;

/// Default search endpoint
pub const DEFAULT_BASE_URL: &str = "https://www.ebay.com/sch/i.html";

/// Default browser-identifying user agent
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Default Accept header
pub const DEFAULT_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// Default Accept-Language header
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";

/// Main configuration structure for Listing-Harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    pub output: OutputConfig,
}

/// What to harvest
#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    /// Search keyword
    pub keyword: String,

    /// Maximum number of records for the run (values <= 0 yield an empty run)
    #[serde(rename = "max-records")]
    pub max_records: i64,

    /// Records requested per page
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,
}

/// Transport configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Search endpoint URL
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Total attempts per page for transient status codes
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base factor for the exponential backoff (seconds)
    #[serde(rename = "backoff-factor-secs", default = "default_backoff_factor_secs")]
    pub backoff_factor_secs: u64,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_accept")]
    pub accept: String,

    #[serde(rename = "accept-language", default = "default_accept_language")]
    pub accept_language: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_factor_secs: default_backoff_factor_secs(),
            user_agent: default_user_agent(),
            accept: default_accept(),
            accept_language: default_accept_language(),
        }
    }
}

/// Request pacing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PacingConfig {
    /// Fixed delay before every page request (milliseconds)
    #[serde(rename = "request-delay-ms", default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Wait before retrying a page after a name-resolution failure (milliseconds)
    #[serde(rename = "dns-retry-delay-ms", default = "default_dns_retry_delay_ms")]
    pub dns_retry_delay_ms: u64,

    /// Cap on name-resolution retries per page; absent means retry forever
    #[serde(rename = "dns-max-retries", default)]
    pub dns_max_retries: Option<u32>,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: default_request_delay_ms(),
            dns_retry_delay_ms: default_dns_retry_delay_ms(),
            dns_max_retries: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the CSV export, if any
    #[serde(rename = "export-path", default)]
    pub export_path: Option<String>,

    /// Path to the markdown summary, if any
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,
}

fn default_page_size() -> u32 {
    100
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_factor_secs() -> u64 {
    2
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_accept() -> String {
    DEFAULT_ACCEPT.to_string()
}

fn default_accept_language() -> String {
    DEFAULT_ACCEPT_LANGUAGE.to_string()
}

fn default_request_delay_ms() -> u64 {
    3000
}

fn default_dns_retry_delay_ms() -> u64 {
    10_000
}
