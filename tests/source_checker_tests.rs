use async_trait::async_trait;
use marketscout::source_checker::{
    check_url, check_urls, extract_urls, ProbeError, ProbeMethod, ProbeResponse,
    SourceCheckResult, SourceCheckSummary, SourceChecker, SourceProber, SourceStatus,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone)]
enum Reply {
    Status(u16),
    Redirect(u16, &'static str),
    Timeout,
    Network(&'static str),
}

/// Answers from a per-(method, url) table; unknown URLs get 200.
#[derive(Default)]
struct TableProber {
    replies: HashMap<(ProbeMethod, String), Reply>,
    requests: Mutex<Vec<(ProbeMethod, String)>>,
}

impl TableProber {
    fn reply(mut self, method: ProbeMethod, url: &str, reply: Reply) -> Self {
        self.replies.insert((method, url.to_string()), reply);
        self
    }

    fn requests(&self) -> Vec<(ProbeMethod, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceProber for TableProber {
    async fn probe(&self, method: ProbeMethod, url: &str) -> Result<ProbeResponse, ProbeError> {
        self.requests.lock().unwrap().push((method, url.to_string()));
        let reply = self
            .replies
            .get(&(method, url.to_string()))
            .cloned()
            .unwrap_or(Reply::Status(200));
        match reply {
            Reply::Status(status) => Ok(ProbeResponse {
                status,
                final_url: url.to_string(),
            }),
            Reply::Redirect(status, to) => Ok(ProbeResponse {
                status,
                final_url: to.to_string(),
            }),
            Reply::Timeout => Err(ProbeError::Timeout),
            Reply::Network(msg) => Err(ProbeError::Network(msg.to_string())),
        }
    }
}

#[test]
fn test_extract_dedupes_and_strips_punctuation() {
    let urls = extract_urls("See https://a.com. Then https://b.com, and https://a.com!");
    assert_eq!(urls, vec!["https://a.com", "https://b.com"]);
}

#[test]
fn test_extract_from_empty_and_linkless_text() {
    assert!(extract_urls("").is_empty());
    assert!(extract_urls("no links here, just www.example.com").is_empty());
}

#[test]
fn test_extract_stops_at_delimiters() {
    let text = r#"[survey](https://x.org/survey?q=1) <https://y.org/a> "https://z.org/b" 'http://w.org'"#;
    assert_eq!(
        extract_urls(text),
        vec![
            "https://x.org/survey?q=1",
            "https://y.org/a",
            "https://z.org/b",
            "http://w.org"
        ]
    );
}

#[tokio::test]
async fn test_alive_and_dead() {
    let prober = TableProber::default().reply(ProbeMethod::Head, "https://gone.com/x", Reply::Status(404));

    let alive = check_url(&prober, "https://ok.com/").await;
    let dead = check_url(&prober, "https://gone.com/x").await;

    assert_eq!(alive.status, SourceStatus::Alive);
    assert_eq!(alive.status_code, Some(200));
    assert_eq!(alive.redirect_url, None);
    assert_eq!(dead.status, SourceStatus::Dead);
    assert_eq!(dead.status_code, Some(404));
}

#[tokio::test]
async fn test_redirect_is_recorded() {
    let prober = TableProber::default().reply(
        ProbeMethod::Head,
        "http://old.com/page",
        Reply::Redirect(200, "https://new.com/page"),
    );

    let result = check_url(&prober, "http://old.com/page").await;

    assert_eq!(result.status, SourceStatus::Alive);
    assert_eq!(result.redirect_url.as_deref(), Some("https://new.com/page"));
}

#[tokio::test]
async fn test_trailing_slash_normalization_is_not_a_redirect() {
    let prober = TableProber::default().reply(
        ProbeMethod::Head,
        "https://a.com",
        Reply::Redirect(200, "https://a.com/"),
    );

    let result = check_url(&prober, "https://a.com").await;

    assert_eq!(result.redirect_url, None);
}

#[tokio::test]
async fn test_405_retries_with_get() {
    let prober = TableProber::default()
        .reply(ProbeMethod::Head, "https://nohead.com/", Reply::Status(405))
        .reply(ProbeMethod::Get, "https://nohead.com/", Reply::Status(200));

    let result = check_url(&prober, "https://nohead.com/").await;

    assert_eq!(result.status, SourceStatus::Alive);
    assert_eq!(
        prober.requests(),
        vec![
            (ProbeMethod::Head, "https://nohead.com/".to_string()),
            (ProbeMethod::Get, "https://nohead.com/".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_405_then_get_failure_is_dead() {
    let prober = TableProber::default()
        .reply(ProbeMethod::Head, "https://strict.com/", Reply::Status(405))
        .reply(ProbeMethod::Get, "https://strict.com/", Reply::Status(403));

    let result = check_url(&prober, "https://strict.com/").await;

    assert_eq!(result.status, SourceStatus::Dead);
    assert_eq!(result.status_code, Some(403));
}

#[tokio::test]
async fn test_timeout_and_network_error() {
    let prober = TableProber::default()
        .reply(ProbeMethod::Head, "https://slow.com/", Reply::Timeout)
        .reply(ProbeMethod::Head, "https://down.com/", Reply::Network("connection refused"));

    let slow = check_url(&prober, "https://slow.com/").await;
    let down = check_url(&prober, "https://down.com/").await;

    assert_eq!(slow.status, SourceStatus::Timeout);
    assert_eq!(slow.error.as_deref(), Some("Request timed out"));
    assert_eq!(down.status, SourceStatus::Error);
    assert_eq!(down.error.as_deref(), Some("connection refused"));
}

#[tokio::test]
async fn test_malformed_url_is_invalid_without_probing() {
    let prober = TableProber::default();

    let result = check_url(&prober, "https://").await;

    assert_eq!(result.status, SourceStatus::Invalid);
    assert_eq!(result.error.as_deref(), Some("Malformed URL"));
    assert!(prober.requests().is_empty());
}

#[tokio::test]
async fn test_summary_counts_single_404() {
    let prober = Arc::new(TableProber::default().reply(
        ProbeMethod::Head,
        "https://example.com/missing",
        Reply::Status(404),
    ));
    let checker = SourceChecker::new().with_prober(prober);

    let summary = checker
        .verify("Source: https://example.com/missing")
        .await
        .unwrap();

    assert_eq!(summary.total_urls, 1);
    assert_eq!(summary.dead, 1);
    assert_eq!(summary.alive, 0);
    assert_eq!(summary.dead_urls.len(), 1);
    assert_eq!(summary.dead_urls[0].status_code, Some(404));
}

#[tokio::test]
async fn test_no_urls_gives_zeroed_summary_without_probing() {
    let prober = Arc::new(TableProber::default());
    let checker = SourceChecker::new().with_prober(prober.clone());

    let summary = checker.verify("A report with no sources.").await.unwrap();

    assert_eq!(summary, SourceCheckSummary::default());
    assert!(prober.requests().is_empty());
}

#[test]
fn test_summary_groups_invalid_with_errors() {
    let summary = SourceCheckSummary::from_results(vec![
        SourceCheckResult::new("https://a.com", SourceStatus::Alive).with_status_code(200),
        SourceCheckResult::new("https://b.com", SourceStatus::Timeout).with_error("Request timed out"),
        SourceCheckResult::new("https://", SourceStatus::Invalid).with_error("Malformed URL"),
        SourceCheckResult::new("https://c.com", SourceStatus::Error).with_error("dns"),
    ]);

    assert_eq!(summary.total_urls, 4);
    assert_eq!(summary.alive, 1);
    assert_eq!(summary.timeout, 1);
    assert_eq!(summary.errors, 2);
    // Timeouts are not listed as dead.
    let listed: Vec<&str> = summary.dead_urls.iter().map(|d| d.url.as_str()).collect();
    assert_eq!(listed, vec!["https://", "https://c.com"]);
}

#[test]
fn test_status_serializes_lowercase() {
    let result = SourceCheckResult::new("https://a.com", SourceStatus::Alive);
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["status"], "alive");
}

/// Tracks the highest number of probes in flight at once.
#[derive(Default)]
struct GaugeProber {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl SourceProber for GaugeProber {
    async fn probe(&self, _method: ProbeMethod, url: &str) -> Result<ProbeResponse, ProbeError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(ProbeResponse {
            status: 200,
            final_url: url.to_string(),
        })
    }
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_is_bounded() {
    let prober = GaugeProber::default();
    let urls: Vec<String> = (0..25).map(|i| format!("https://site{}.com/", i)).collect();

    let results = check_urls(&prober, &urls, 10).await;

    assert_eq!(results.len(), 25);
    assert!(results.iter().all(|r| r.status == SourceStatus::Alive));
    assert_eq!(results[7].url, "https://site7.com/");
    let peak = prober.peak.load(Ordering::SeqCst);
    assert!(peak <= 10, "peak concurrency was {}", peak);
    assert!(peak > 1);
}
