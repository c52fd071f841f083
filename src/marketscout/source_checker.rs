//! HTTP liveness checks for the links cited in a synthesized report.
//!
//! The checker pulls every `http(s)://` link out of free text, probes each one
//! with a HEAD request (falling back to GET when the server answers 405), and
//! classifies it as alive, dead, timed out, invalid, or errored. Probes run
//! concurrently behind a counting semaphore.
//!
//! The network sits behind the [`SourceProber`] trait so the classification
//! logic can be exercised without sockets. [`HttpProber`] is the `reqwest`
//! implementation; one is built per [`SourceChecker::verify`] call so its
//! connection pool lives exactly as long as one verification pass.
//!
//! # Example
//!
//! ```
//! use marketscout::source_checker::extract_urls;
//!
//! let urls = extract_urls("See https://a.com. Then https://b.com, and https://a.com!");
//! assert_eq!(urls, vec!["https://a.com", "https://b.com"]);
//! ```

use async_trait::async_trait;
use futures_util::future::join_all;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

/// Per-request timeout for a probe.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum number of probes in flight at once.
pub const MAX_CONCURRENT: usize = 10;

const USER_AGENT: &str = "MarketScout/0.4 (source verification)";

lazy_static! {
    static ref URL_RE: Regex = Regex::new(r#"https?://[^\s)\]>"']+"#).unwrap();
}

/// Extract every HTTP/HTTPS link in `text`, deduplicated in first-seen order.
///
/// A link ends at whitespace or one of `) ] > " '`. Trailing sentence
/// punctuation (`. , ; : ! ?`) is dropped.
pub fn extract_urls(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for found in URL_RE.find_iter(text) {
        let url = found
            .as_str()
            .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | '!' | '?'));
        if seen.insert(url.to_string()) {
            unique.push(url.to_string());
        }
    }
    unique
}

/// Classification of a single link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Alive,
    Dead,
    Timeout,
    Invalid,
    Error,
}

/// Outcome of checking one link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCheckResult {
    pub url: String,
    pub status: SourceStatus,
    pub status_code: Option<u16>,
    /// Final location when the request was redirected elsewhere.
    pub redirect_url: Option<String>,
    pub error: Option<String>,
}

impl SourceCheckResult {
    pub fn new(url: impl Into<String>, status: SourceStatus) -> Self {
        Self {
            url: url.into(),
            status,
            status_code: None,
            redirect_url: None,
            error: None,
        }
    }

    pub fn with_status_code(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    pub fn with_redirect(mut self, redirect_url: Option<String>) -> Self {
        self.redirect_url = redirect_url;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// HTTP method used by a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeMethod {
    Head,
    Get,
}

/// What a probe observed once response headers arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    /// URL after following redirects.
    pub final_url: String,
}

/// Transport-level probe failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    Timeout,
    Network(String),
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Timeout => write!(f, "Request timed out"),
            ProbeError::Network(msg) => write!(f, "{}", msg),
        }
    }
}

impl Error for ProbeError {}

/// Issues a single HTTP request for a link.
#[async_trait]
pub trait SourceProber: Send + Sync {
    async fn probe(&self, method: ProbeMethod, url: &str) -> Result<ProbeResponse, ProbeError>;
}

/// Errors that abort a whole verification pass.
#[derive(Debug)]
pub enum SourceCheckError {
    /// The HTTP client could not be constructed.
    ClientBuild(String),
}

impl fmt::Display for SourceCheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceCheckError::ClientBuild(msg) => {
                write!(f, "Failed to build HTTP client: {}", msg)
            }
        }
    }
}

impl Error for SourceCheckError {}

/// [`SourceProber`] backed by a pooled `reqwest` client.
///
/// Follows redirects and skips certificate validation: this is a liveness
/// check, not a security check.
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> Result<Self, SourceCheckError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .danger_accept_invalid_certs(true)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SourceCheckError::ClientBuild(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SourceProber for HttpProber {
    async fn probe(&self, method: ProbeMethod, url: &str) -> Result<ProbeResponse, ProbeError> {
        let request = match method {
            ProbeMethod::Head => self.client.head(url),
            ProbeMethod::Get => self.client.get(url),
        };
        match request.send().await {
            Ok(response) => Ok(ProbeResponse {
                status: response.status().as_u16(),
                final_url: response.url().to_string(),
            }),
            Err(e) if e.is_timeout() => Err(ProbeError::Timeout),
            Err(e) => Err(ProbeError::Network(e.to_string())),
        }
    }
}

/// Check one link.
///
/// Malformed links are classified `invalid` without touching the prober.
/// A 405 on HEAD is retried once with GET.
pub async fn check_url(prober: &dyn SourceProber, url: &str) -> SourceCheckResult {
    let parsed = match Url::parse(url) {
        Ok(parsed) if parsed.host_str().map_or(false, |h| !h.is_empty()) => parsed,
        _ => {
            return SourceCheckResult::new(url, SourceStatus::Invalid).with_error("Malformed URL")
        }
    };

    let response = match prober.probe(ProbeMethod::Head, url).await {
        Ok(response) if response.status == 405 => {
            log::debug!("HEAD not allowed for {}, retrying with GET", url);
            prober.probe(ProbeMethod::Get, url).await
        }
        other => other,
    };

    match response {
        Ok(response) if response.status < 400 => {
            SourceCheckResult::new(url, SourceStatus::Alive)
                .with_status_code(response.status)
                .with_redirect(redirect_target(&parsed, &response.final_url))
        }
        Ok(response) => {
            SourceCheckResult::new(url, SourceStatus::Dead).with_status_code(response.status)
        }
        Err(ProbeError::Timeout) => {
            SourceCheckResult::new(url, SourceStatus::Timeout).with_error("Request timed out")
        }
        Err(ProbeError::Network(msg)) => {
            SourceCheckResult::new(url, SourceStatus::Error).with_error(msg)
        }
    }
}

/// The final URL, when it points somewhere other than the requested one.
/// Compared after normalization so `https://a.com` and `https://a.com/` match.
fn redirect_target(requested: &Url, final_url: &str) -> Option<String> {
    match Url::parse(final_url) {
        Ok(resolved) if &resolved == requested => None,
        _ if final_url == requested.as_str() => None,
        _ => Some(final_url.to_string()),
    }
}

/// Check every link with at most `max_concurrent` probes in flight.
/// Results come back in the order of `urls`.
pub async fn check_urls(
    prober: &dyn SourceProber,
    urls: &[String],
    max_concurrent: usize,
) -> Vec<SourceCheckResult> {
    let semaphore = Semaphore::new(max_concurrent.max(1));
    let checks = urls.iter().map(|url| {
        let semaphore = &semaphore;
        async move {
            // The semaphore is never closed, so acquire only fails if it were.
            let _permit = semaphore.acquire().await.ok();
            check_url(prober, url).await
        }
    });
    join_all(checks).await
}

/// A dead, invalid, or errored link surfaced to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadUrl {
    pub url: String,
    pub status_code: Option<u16>,
    pub error: Option<String>,
}

/// Aggregate result of a verification pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceCheckSummary {
    pub total_urls: usize,
    pub alive: usize,
    pub dead: usize,
    pub timeout: usize,
    /// Errored and invalid links together.
    pub errors: usize,
    pub dead_urls: Vec<DeadUrl>,
    pub results: Vec<SourceCheckResult>,
}

impl SourceCheckSummary {
    pub fn from_results(results: Vec<SourceCheckResult>) -> Self {
        let count = |wanted: &[SourceStatus]| {
            results
                .iter()
                .filter(|r| wanted.contains(&r.status))
                .count()
        };
        let dead_urls = results
            .iter()
            .filter(|r| {
                matches!(
                    r.status,
                    SourceStatus::Dead | SourceStatus::Error | SourceStatus::Invalid
                )
            })
            .map(|r| DeadUrl {
                url: r.url.clone(),
                status_code: r.status_code,
                error: r.error.clone(),
            })
            .collect();

        Self {
            total_urls: results.len(),
            alive: count(&[SourceStatus::Alive]),
            dead: count(&[SourceStatus::Dead]),
            timeout: count(&[SourceStatus::Timeout]),
            errors: count(&[SourceStatus::Error, SourceStatus::Invalid]),
            dead_urls,
            results,
        }
    }
}

/// Runs verification passes over report text.
///
/// ```rust,no_run
/// use marketscout::source_checker::SourceChecker;
///
/// # async {
/// let summary = SourceChecker::new()
///     .verify("Sources: https://www.rust-lang.org and https://example.com/missing")
///     .await
///     .unwrap();
/// println!("{} of {} links alive", summary.alive, summary.total_urls);
/// # };
/// ```
#[derive(Clone)]
pub struct SourceChecker {
    prober: Option<Arc<dyn SourceProber>>,
    max_concurrent: usize,
    request_timeout: Duration,
}

impl Default for SourceChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceChecker {
    pub fn new() -> Self {
        Self {
            prober: None,
            max_concurrent: MAX_CONCURRENT,
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    /// Use a fixed prober instead of building an [`HttpProber`] per pass.
    pub fn with_prober(mut self, prober: Arc<dyn SourceProber>) -> Self {
        self.prober = Some(prober);
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Extract and check every link in `report_text`.
    ///
    /// Text without links yields a zeroed summary and no network activity.
    pub async fn verify(&self, report_text: &str) -> Result<SourceCheckSummary, SourceCheckError> {
        let urls = extract_urls(report_text);
        if urls.is_empty() {
            return Ok(SourceCheckSummary::default());
        }

        log::info!("Checking {} URLs from report", urls.len());
        let results = match &self.prober {
            Some(prober) => check_urls(prober.as_ref(), &urls, self.max_concurrent).await,
            None => {
                let prober = HttpProber::new(self.request_timeout)?;
                check_urls(&prober, &urls, self.max_concurrent).await
            }
        };

        let summary = SourceCheckSummary::from_results(results);
        log::info!(
            "Source check complete: {} alive, {} dead, {} timeout, {} errors out of {} total",
            summary.alive,
            summary.dead,
            summary.timeout,
            summary.errors,
            summary.total_urls
        );
        Ok(summary)
    }
}

/// Verify `report_text` over the network with default settings.
pub async fn verify_report_sources(
    report_text: &str,
) -> Result<SourceCheckSummary, SourceCheckError> {
    SourceChecker::new().verify(report_text).await
}
