use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::insights::LogFindings;
use crate::pool::WorkerPool;

use super::client::GitHubClient;

/// A named test failure, e.g. `Test [no-errors-in-logs]:`.
pub const FAILED_TEST_PATTERN: &str = r"Test \[(.*)]:";
/// An error-level structured log line, from the level marker to end of line.
pub const ERROR_LINE_PATTERN: &str = r" level=error.*";
/// The quoted message of a structured log line.
pub const ERROR_MESSAGE_PATTERN: &str = r#"msg="([^"]+)""#;
/// Test whose failure means the job's log needs a manual look.
pub const LOG_ERRORS_SENTINEL: &str = "check-log-errors";
/// Upper bound on matches taken per pattern from one log body.
pub const MAX_MATCHES_PER_LOG: usize = 10_000;

static FAILED_TEST_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(FAILED_TEST_PATTERN).expect("Invalid regex pattern"));
static ERROR_LINE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(ERROR_LINE_PATTERN).expect("Invalid regex pattern"));
static ERROR_MESSAGE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(ERROR_MESSAGE_PATTERN).expect("Invalid regex pattern"));

/// Pulls keys to count out of a raw log body.
pub trait LogMatcher {
    fn extract<'a>(&self, body: &'a str) -> Vec<&'a str>;
}

/// Names of failed tests.
pub struct FailedTestMatcher;

impl LogMatcher for FailedTestMatcher {
    fn extract<'a>(&self, body: &'a str) -> Vec<&'a str> {
        FAILED_TEST_REGEX
            .captures_iter(body)
            .take(MAX_MATCHES_PER_LOG)
            .filter_map(|caps| caps.get(1))
            .map(|name| name.as_str())
            .collect()
    }
}

/// Messages of error-level log lines. Lines without a `msg="..."` field yield nothing.
pub struct ErrorMessageMatcher;

impl LogMatcher for ErrorMessageMatcher {
    fn extract<'a>(&self, body: &'a str) -> Vec<&'a str> {
        ERROR_LINE_REGEX
            .find_iter(body)
            .take(MAX_MATCHES_PER_LOG)
            .filter_map(|line| ERROR_MESSAGE_REGEX.captures(line.as_str()))
            .filter_map(|caps| caps.get(1))
            .map(|message| message.as_str())
            .collect()
    }
}

/// Downloads every log and counts failed tests and error messages across them.
///
/// Logs that cannot be downloaded are logged and contribute nothing.
pub(super) async fn mine_logs(
    client: &GitHubClient,
    pool: &WorkerPool,
    log_urls: &[Url],
) -> LogFindings {
    info!("Mining {} job logs", log_urls.len());

    let bodies = pool
        .dispatch("logs", log_urls.iter().cloned(), |url| async move {
            client.download_log(&url).await
        })
        .await;

    let mut findings = LogFindings::default();
    for url in log_urls {
        if let Some(body) = bodies.get(url) {
            scan_log(&mut findings, url, body);
        }
    }

    for url in &findings.diagnostic_urls {
        debug!("Job log with {LOG_ERRORS_SENTINEL} test failure: {url}");
    }
    findings
}

fn scan_log(findings: &mut LogFindings, url: &Url, body: &str) {
    for test in FailedTestMatcher.extract(body) {
        findings.failed_tests.increment(test);
        if test == LOG_ERRORS_SENTINEL {
            findings.diagnostic_urls.push(url.clone());
        }
    }
    for message in ErrorMessageMatcher.extract(body) {
        findings.error_messages.increment(message);
    }
}
