//! HTTP transport for the KITopen report endpoint.

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, LOCATION, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::config::KitOpenConfig;
use crate::error::SearchError;
use crate::search::ExportParameters;
use crate::transport::{ExportJob, ExportStatus, ExportSubmission, ExportTransport, TransportFuture};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Query parameter keys (case-insensitive) whose values are never logged.
const SENSITIVE_QUERY_PARAMS: &[&str] = &["authors", "session", "sid", "token"];

// ─────────────────────────────────────────────────────────────────────────────
// LoggingMode
// ─────────────────────────────────────────────────────────────────────────────

/// Controls how URLs are sanitized for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoggingMode {
    /// Log only the path component.
    /// Example: `/auswertungen/report.php`
    #[default]
    PathOnly,

    /// Log path and query parameters, with sensitive values redacted.
    /// Example: `/auswertungen/report.php?authors=***&year=2012-2012`
    PathAndQueryRedacted,
}

fn is_sensitive_param(key: &str) -> bool {
    let key_lower = key.to_ascii_lowercase();
    SENSITIVE_QUERY_PARAMS
        .iter()
        .any(|&sensitive| key_lower == sensitive)
}

/// Renders `url` for logs. Never includes scheme, host or fragment.
pub fn sanitize_url_for_logs(url: &Url, mode: LoggingMode) -> String {
    let path = url.path();

    match mode {
        LoggingMode::PathOnly => path.to_string(),
        LoggingMode::PathAndQueryRedacted => {
            let query_pairs: Vec<_> = url.query_pairs().collect();
            if query_pairs.is_empty() {
                return path.to_string();
            }

            let redacted_pairs: Vec<String> = query_pairs
                .into_iter()
                .map(|(key, value)| {
                    if is_sensitive_param(&key) {
                        format!("{}=***", key)
                    } else {
                        format!("{}={}", key, value)
                    }
                })
                .collect();

            format!("{}?{}", path, redacted_pairs.join("&"))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HttpTransport
// ─────────────────────────────────────────────────────────────────────────────

/// [`ExportTransport`] over plain HTTP GET requests.
///
/// - `200 OK` on the report URL is the finished archive
/// - `202 Accepted` queues a job at `Location` (or the request URL)
/// - polling a job: `200` is ready, `202`/`404` still pending
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    search_url: Url,
    logging_mode: LoggingMode,
}

impl HttpTransport {
    /// # Errors
    ///
    /// Returns `SearchError::Configuration` if the user agent is not a valid
    /// header value or the HTTP client fails to initialize.
    pub fn new(search_url: Url, user_agent: &str, request_timeout: Duration) -> Result<Self, SearchError> {
        Ok(Self {
            http: build_http_client(user_agent, request_timeout)?,
            search_url,
            logging_mode: LoggingMode::default(),
        })
    }

    /// Builds a transport from the search URL, user agent, request timeout
    /// and logging mode of `config`.
    pub fn from_config(config: &KitOpenConfig) -> Result<Self, SearchError> {
        let search_url = config.parsed_search_url()?;
        Ok(Self::new(search_url, &config.user_agent, config.request_timeout())?
            .with_logging_mode(config.logging_mode))
    }

    pub fn with_logging_mode(mut self, mode: LoggingMode) -> Self {
        self.logging_mode = mode;
        self
    }

    pub fn search_url(&self) -> &Url {
        &self.search_url
    }

    /// Report URL with `params` appended as query string.
    pub fn export_url(&self, params: &ExportParameters) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut().extend_pairs(params.iter());
        url
    }

    /// Executes a GET with timing and sanitized logging.
    ///
    /// Error messages never contain the raw URL.
    async fn get(&self, url: &Url) -> Result<reqwest::Response, SearchError> {
        let start = Instant::now();
        let sanitized_url = sanitize_url_for_logs(url, self.logging_mode);

        let result = self.http.get(url.as_str()).send().await;
        let duration_ms = start.elapsed().as_millis();

        match result {
            Ok(response) => {
                info!(
                    "[HTTP] GET {} {} {}ms",
                    sanitized_url,
                    response.status().as_u16(),
                    duration_ms
                );
                Ok(response)
            }
            Err(e) => {
                info!("[HTTP] GET {} FAILED {}ms", sanitized_url, duration_ms);
                let reason = if e.is_timeout() {
                    "Request to export server timed out"
                } else {
                    "Connection to export server failed"
                };
                Err(SearchError::transport(reason))
            }
        }
    }

    async fn submit(&self, params: &ExportParameters) -> Result<ExportSubmission, SearchError> {
        let url = self.export_url(params);
        let response = self.get(&url).await?;

        match response.status() {
            StatusCode::OK => Ok(ExportSubmission::Completed(read_body(response).await?)),
            StatusCode::ACCEPTED => {
                let job_url = job_location(response.headers(), &url);
                debug!(
                    "[HTTP] Export queued at {}",
                    sanitize_url_for_logs(&job_url, self.logging_mode)
                );
                Ok(ExportSubmission::Queued(ExportJob {
                    id: job_url.to_string(),
                }))
            }
            status => Err(status_error(status)),
        }
    }

    async fn poll(&self, job: &ExportJob) -> Result<ExportStatus, SearchError> {
        let url = Url::parse(&job.id)
            .map_err(|_| SearchError::transport("Export job handle is not a URL"))?;
        let response = self.get(&url).await?;

        match response.status() {
            StatusCode::OK => Ok(ExportStatus::Ready(read_body(response).await?)),
            StatusCode::ACCEPTED | StatusCode::NOT_FOUND => Ok(ExportStatus::Pending),
            status => Err(status_error(status)),
        }
    }
}

impl ExportTransport for HttpTransport {
    fn submit_export<'a>(
        &'a self,
        params: &'a ExportParameters,
    ) -> TransportFuture<'a, ExportSubmission> {
        Box::pin(self.submit(params))
    }

    fn poll_export<'a>(&'a self, job: &'a ExportJob) -> TransportFuture<'a, ExportStatus> {
        Box::pin(self.poll(job))
    }
}

/// Resolves the job URL from `Location`, falling back to the request URL.
fn job_location(headers: &HeaderMap, request_url: &Url) -> Url {
    headers
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|loc| request_url.join(loc).ok())
        .unwrap_or_else(|| request_url.clone())
}

async fn read_body(response: reqwest::Response) -> Result<Vec<u8>, SearchError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|_| SearchError::transport("Failed to read export body"))?;
    Ok(bytes.to_vec())
}

fn status_error(status: StatusCode) -> SearchError {
    SearchError::Transport {
        message: format!("Export server answered {}", status),
        status: Some(status.as_u16()),
    }
}

fn build_http_client(user_agent: &str, timeout: Duration) -> Result<reqwest::Client, SearchError> {
    let mut headers = HeaderMap::new();
    let agent = HeaderValue::from_str(user_agent)
        .map_err(|_| SearchError::Configuration(format!("Invalid user agent: {:?}", user_agent)))?;
    headers.insert(USER_AGENT, agent);

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|e| SearchError::Configuration(format!("Failed to build HTTP client: {}", e)))
}
