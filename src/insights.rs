use std::time::Duration;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

/// Statistics for a trailing window of the most recent runs of one workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowStat {
    pub workflow: String,
    pub window_size: usize,
    /// Start time of the oldest run in the window
    pub from: DateTime<Utc>,
    /// Start time of the newest run in the window
    pub to: DateTime<Utc>,
    pub success_count: usize,
    pub total_count: usize,
    pub success_rate: f64,
    /// Mean duration of successful runs; `None` when the window holds no successes
    #[serde(rename = "average_duration_secs", serialize_with = "as_seconds")]
    pub average_duration: Option<Duration>,
}

/// Occurrence counts keyed by name (job, step, test or error message).
///
/// Keys keep their first-seen order, so equal counts stay in insertion order when sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable(IndexMap<String, usize>);

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, key: &str) {
        if let Some(count) = self.0.get_mut(key) {
            *count += 1;
        } else {
            self.0.insert(key.to_string(), 1);
        }
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> usize {
        self.0.get(key).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries ordered by descending count.
    pub fn sorted(&self) -> Vec<(&str, usize)> {
        let mut entries: Vec<(&str, usize)> =
            self.0.iter().map(|(key, count)| (key.as_str(), *count)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
    }
}

impl<'a> FromIterator<&'a str> for FrequencyTable {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut table = Self::new();
        for key in iter {
            table.increment(key);
        }
        table
    }
}

#[derive(Serialize)]
struct CountEntry<'a> {
    name: &'a str,
    count: usize,
}

impl Serialize for FrequencyTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(
            self.sorted()
                .into_iter()
                .map(|(name, count)| CountEntry { name, count }),
        )
    }
}

/// Job and step failure counts gathered from the failed runs of one workflow.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FailureBreakdown {
    pub failed_jobs: FrequencyTable,
    pub failed_steps: FrequencyTable,
    pub cancelled_steps: FrequencyTable,
    /// Download locations of the logs of failed jobs
    pub log_urls: Vec<url::Url>,
}

/// Failure causes mined from raw job logs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LogFindings {
    pub failed_tests: FrequencyTable,
    pub error_messages: FrequencyTable,
    /// Logs whose `check-log-errors` test failed; worth reading by hand
    pub diagnostic_urls: Vec<url::Url>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureAnalysis {
    pub breakdown: FailureBreakdown,
    pub logs: LogFindings,
}

/// Windowed statistics for one workflow, with failure analysis when requested.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    pub workflow: String,
    /// Run-history page of the workflow filtered by branch and event
    pub url: String,
    pub windows: Vec<WindowStat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failures: Option<FailureAnalysis>,
}

/// All-time statistics of one workflow, paired with its run-history page.
#[derive(Debug, Clone, Serialize)]
pub struct RankedWorkflow {
    pub stats: WindowStat,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    /// Worst success rate first
    pub least_reliable: Vec<RankedWorkflow>,
    /// Longest average duration first
    pub slowest: Vec<RankedWorkflow>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum DashboardReport {
    Summary(SummaryReport),
    Workflows { workflows: Vec<WorkflowReport> },
}

fn as_seconds<S: Serializer>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
    match duration {
        Some(duration) => serializer.serialize_some(&duration.as_secs_f64()),
        None => serializer.serialize_none(),
    }
}
