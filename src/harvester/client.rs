//! HTTP client adapter
//!
//! This module handles every request the harvester makes:
//! - Building one pooled HTTP client per run with the browser header set
//! - Building the search query for a page
//! - Bounded exponential backoff for transient status codes
//! - Error classification (timeout, name resolution, other transport failures)
//!
//! # Retry Logic
//!
//! | Condition | Action |
//! |-----------|--------|
//! | HTTP 429, 500, 502, 503, 504 | Retry with backoff, up to `max_attempts` total |
//! | Other non-2xx status | Immediate → `UnexpectedStatus` |
//! | No response within timeout | Immediate → `Timeout` |
//! | Host name does not resolve | Immediate → `NameResolution` (retried by the controller) |
//! | Connection refused, broken body, etc. | Immediate → `Transport` |

use crate::config::HttpConfig;
use crate::harvester::retry::{retry_with_backoff, BackoffPolicy};
use crate::{ConfigError, HarvestError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Status codes retried by the adapter
pub const RETRYABLE_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

/// Category id sent with every search (all categories)
pub const CATEGORY_ID: u32 = 0;

/// Returns true if `status` is retried with backoff
pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUS_CODES.contains(&status)
}

/// Errors surfaced by the adapter
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("name resolution failed for {url}: {message}")]
    NameResolution { url: String, message: String },

    #[error("transient HTTP status {status} from {url}")]
    TransientStatus { status: u16, url: String },

    #[error("HTTP status {status} from {url} persisted after {attempts} attempts")]
    RetriesExhausted {
        status: u16,
        url: String,
        attempts: u32,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },
}

impl FetchError {
    /// Returns true for the failure the controller retries on its own
    pub fn is_name_resolution(&self) -> bool {
        matches!(self, Self::NameResolution { .. })
    }

    /// Returns true for errors the adapter's backoff retries
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientStatus { .. })
    }

    /// Short code for logs and run records
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::NameResolution { .. } => "name_resolution",
            Self::TransientStatus { .. } => "transient_status",
            Self::RetriesExhausted { .. } => "retries_exhausted",
            Self::UnexpectedStatus { .. } => "unexpected_status",
            Self::Transport { .. } => "transport",
        }
    }
}

/// Parameters for one page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub keyword: String,
    pub page: u32,
    pub page_size: u32,
}

impl FetchRequest {
    /// Query parameters in the order they are sent
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("_nkw", self.keyword.clone()),
            ("_sacat", CATEGORY_ID.to_string()),
            ("_ipg", self.page_size.to_string()),
            ("_pgn", self.page.to_string()),
        ]
    }
}

/// A successful fetch
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Final URL after redirects
    pub final_url: String,
    /// HTTP status code
    pub status_code: u16,
    /// Page body
    pub body: String,
    /// Attempts it took, including the successful one
    pub attempts: u32,
}

/// Source of search-result pages
///
/// The pagination controller only talks to this trait, so a run can be driven
/// by something other than the network.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, request: &FetchRequest) -> Result<FetchResult, FetchError>;
}

/// Builds the pooled HTTP client for a run
///
/// The returned `Client` keeps its connections alive between pages.
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_secs(config.timeout_secs);

    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Builds the fixed browser-identifying header set
pub fn browser_headers(config: &HttpConfig) -> Result<HeaderMap, ConfigError> {
    let value = |name: &str, raw: &str| {
        HeaderValue::from_str(raw)
            .map_err(|e| ConfigError::Validation(format!("Invalid {} header value: {}", name, e)))
    };

    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, value("User-Agent", &config.user_agent)?);
    headers.insert(ACCEPT, value("Accept", &config.accept)?);
    headers.insert(ACCEPT_LANGUAGE, value("Accept-Language", &config.accept_language)?);
    Ok(headers)
}

/// reqwest-backed page source
pub struct HttpPageSource {
    client: Client,
    base_url: Url,
    headers: HeaderMap,
    timeout: Duration,
    backoff: BackoffPolicy,
}

impl HttpPageSource {
    /// Creates the adapter for one run
    pub fn new(config: &HttpConfig) -> Result<Self, HarvestError> {
        let base_url = Url::parse(&config.base_url)?;
        let headers = browser_headers(config)?;
        let client = build_http_client(config)?;

        Ok(Self {
            client,
            base_url,
            headers,
            timeout: Duration::from_secs(config.timeout_secs),
            backoff: BackoffPolicy::new(
                config.max_attempts,
                Duration::from_secs(config.backoff_factor_secs),
            ),
        })
    }

    /// The full URL requested for `request`
    pub fn search_url(&self, request: &FetchRequest) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .extend_pairs(request.query_params().iter().map(|(k, v)| (*k, v.as_str())));
        url
    }

    /// Issues a GET with query `params` and `headers`, retrying transient statuses
    ///
    /// # Returns
    ///
    /// * `Ok(FetchResult)` - 2xx response with its body
    /// * `Err(FetchError::RetriesExhausted)` - transient status on every attempt
    /// * `Err(FetchError)` - any other failure, not retried here
    pub async fn fetch(
        &self,
        url: &str,
        params: &[(&str, String)],
        headers: &HeaderMap,
        timeout: Duration,
    ) -> Result<FetchResult, FetchError> {
        let attempts = AtomicU32::new(0);

        let result = retry_with_backoff(&self.backoff, FetchError::is_transient, || {
            let request = self
                .client
                .get(url)
                .query(params)
                .headers(headers.clone())
                .timeout(timeout);
            let attempts = &attempts;
            async move {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                send_once(request, url, timeout, attempt).await
            }
        })
        .await;

        result.map_err(|err| match err {
            FetchError::TransientStatus { status, url } => FetchError::RetriesExhausted {
                status,
                url,
                attempts: attempts.load(Ordering::SeqCst),
            },
            other => other,
        })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_page(&self, request: &FetchRequest) -> Result<FetchResult, FetchError> {
        let params = request.query_params();

        tracing::debug!(
            page = request.page,
            url = %self.search_url(request),
            "Requesting search page"
        );

        self.fetch(self.base_url.as_str(), &params, &self.headers, self.timeout)
            .await
    }
}

/// Sends one request and classifies the outcome
async fn send_once(
    request: RequestBuilder,
    url: &str,
    timeout: Duration,
    attempt: u32,
) -> Result<FetchResult, FetchError> {
    let response = request
        .send()
        .await
        .map_err(|e| classify_transport_error(url, timeout, &e))?;

    let status = response.status();
    let final_url = response.url().to_string();

    if is_retryable_status(status.as_u16()) {
        return Err(FetchError::TransientStatus {
            status: status.as_u16(),
            url: final_url,
        });
    }

    if !status.is_success() {
        return Err(FetchError::UnexpectedStatus {
            status: status.as_u16(),
            url: final_url,
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| classify_transport_error(url, timeout, &e))?;

    Ok(FetchResult {
        final_url,
        status_code: status.as_u16(),
        body,
        attempts: attempt,
    })
}

/// Maps a reqwest failure onto the adapter's error kinds
fn classify_transport_error(url: &str, timeout: Duration, err: &reqwest::Error) -> FetchError {
    let message = error_chain(err);

    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            timeout_secs: timeout.as_secs(),
        }
    } else if looks_like_name_resolution(&message) {
        FetchError::NameResolution {
            url: url.to_string(),
            message,
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            message,
        }
    }
}

/// Joins an error and all of its sources into one line
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Returns true if a transport error message describes a DNS lookup failure
pub fn looks_like_name_resolution(message: &str) -> bool {
    const MARKERS: [&str; 6] = [
        "dns error",
        "failed to lookup address",
        "name resolution",
        "name or service not known",
        "nodename nor servname",
        "no such host",
    ];

    let lower = message.to_lowercase();
    MARKERS.iter().any(|marker| lower.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> HttpConfig {
        HttpConfig {
            base_url: base_url.to_string(),
            timeout_secs: 1,
            backoff_factor_secs: 0,
            ..HttpConfig::default()
        }
    }

    fn request(page: u32) -> FetchRequest {
        FetchRequest {
            keyword: "laptop".to_string(),
            page,
            page_size: 100,
        }
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&HttpConfig::default()).is_ok());
    }

    #[test]
    fn test_query_params() {
        let params = request(3).query_params();
        assert_eq!(
            params,
            vec![
                ("_nkw", "laptop".to_string()),
                ("_sacat", "0".to_string()),
                ("_ipg", "100".to_string()),
                ("_pgn", "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_search_url_encodes_keyword() {
        let source = HttpPageSource::new(&HttpConfig::default()).unwrap();
        let url = source.search_url(&FetchRequest {
            keyword: "gaming laptop".to_string(),
            page: 2,
            page_size: 50,
        });
        assert_eq!(
            url.as_str(),
            "https://www.ebay.com/sch/i.html?_nkw=gaming+laptop&_sacat=0&_ipg=50&_pgn=2"
        );
    }

    #[test]
    fn test_browser_headers() {
        let headers = browser_headers(&HttpConfig::default()).unwrap();
        assert!(headers[USER_AGENT].to_str().unwrap().starts_with("Mozilla/5.0"));
        assert_eq!(headers[ACCEPT_LANGUAGE], "en-US,en;q=0.5");
    }

    #[test]
    fn test_browser_headers_reject_invalid_value() {
        let config = HttpConfig {
            accept: "text/html\nX-Injected: 1".to_string(),
            ..HttpConfig::default()
        };
        assert!(browser_headers(&config).is_err());
    }

    #[test]
    fn test_retryable_status_codes() {
        for status in [429, 500, 502, 503, 504] {
            assert!(is_retryable_status(status));
        }
        for status in [200, 301, 400, 403, 404, 501] {
            assert!(!is_retryable_status(status));
        }
    }

    #[test]
    fn test_looks_like_name_resolution() {
        assert!(looks_like_name_resolution(
            "error sending request: dns error: failed to lookup address information"
        ));
        assert!(looks_like_name_resolution(
            "Temporary failure in name resolution"
        ));
        assert!(looks_like_name_resolution("Name or service not known"));
        assert!(!looks_like_name_resolution("Connection refused (os error 111)"));
        assert!(!looks_like_name_resolution("operation timed out"));
    }

    #[tokio::test]
    async fn test_fetch_page_sends_query_and_headers() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sch/i.html"))
            .and(query_param("_nkw", "laptop"))
            .and(query_param("_sacat", "0"))
            .and(query_param("_ipg", "100"))
            .and(query_param("_pgn", "1"))
            .and(header("user-agent", "listing-harvester-test/1.0"))
            .and(header("accept-language", "en-GB"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .expect(1)
            .mount(&mock_server)
            .await;

        // Header matchers split values on commas, so both values here have none
        let config = HttpConfig {
            user_agent: "listing-harvester-test/1.0".to_string(),
            accept_language: "en-GB".to_string(),
            ..test_config(&format!("{}/sch/i.html", mock_server.uri()))
        };
        let source = HttpPageSource::new(&config).unwrap();

        let result = source.fetch_page(&request(1)).await.unwrap();
        assert_eq!(result.status_code, 200);
        assert_eq!(result.body, "<html></html>");
        assert_eq!(result.attempts, 1);
    }

    #[tokio::test]
    async fn test_fetch_page_exhausts_retries_on_503() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&mock_server)
            .await;

        let config = test_config(&format!("{}/sch/i.html", mock_server.uri()));
        let source = HttpPageSource::new(&config).unwrap();

        let err = source.fetch_page(&request(1)).await.unwrap_err();
        assert!(
            matches!(
                err,
                FetchError::RetriesExhausted {
                    status: 503,
                    attempts: 3,
                    ..
                }
            ),
            "unexpected error: {:?}",
            err
        );
    }

    #[tokio::test]
    async fn test_fetch_page_recovers_after_transient_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&mock_server)
            .await;

        let config = test_config(&format!("{}/sch/i.html", mock_server.uri()));
        let source = HttpPageSource::new(&config).unwrap();

        let result = source.fetch_page(&request(1)).await.unwrap();
        assert_eq!(result.body, "ok");
        assert_eq!(result.attempts, 2);
    }

    #[tokio::test]
    async fn test_fetch_page_does_not_retry_404() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = test_config(&format!("{}/sch/i.html", mock_server.uri()));
        let source = HttpPageSource::new(&config).unwrap();

        let err = source.fetch_page(&request(1)).await.unwrap_err();
        assert!(matches!(err, FetchError::UnexpectedStatus { status: 404, .. }));
        assert!(!err.is_name_resolution());
    }

    #[tokio::test]
    async fn test_fetch_page_times_out() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let config = test_config(&format!("{}/sch/i.html", mock_server.uri()));
        let source = HttpPageSource::new(&config).unwrap();

        let err = source.fetch_page(&request(1)).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout { timeout_secs: 1, .. }));
        assert_eq!(err.kind(), "timeout");
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let config = test_config(&format!("http://127.0.0.1:{}/sch/i.html", port));
        let source = HttpPageSource::new(&config).unwrap();

        let err = source.fetch_page(&request(1)).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }), "unexpected error: {:?}", err);
        assert!(!err.is_name_resolution());
    }
}
