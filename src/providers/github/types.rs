use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal outcome reported by GitHub for runs, jobs and steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conclusion {
    Success,
    Failure,
    Cancelled,
    Skipped,
    Neutral,
    TimedOut,
    ActionRequired,
    Stale,
    StartupFailure,
    #[serde(other)]
    Unknown,
}

/// A workflow definition as listed by the repository.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubWorkflow {
    /// Path to the workflow file (e.g., ".github/workflows/ci.yaml")
    pub path: String,
}

impl GitHubWorkflow {
    /// Workflow identifier used by the runs endpoint: the base name of its file.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// One completed execution of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubWorkflowRun {
    /// Unique identifier for the workflow run
    pub id: u64,
    /// Conclusion of the run; `None` while still in progress
    pub conclusion: Option<Conclusion>,
    /// When the run was created
    pub created_at: DateTime<Utc>,
    /// When the current attempt started executing
    #[serde(default)]
    pub run_started_at: Option<DateTime<Utc>>,
    /// Last update, used as the completion time
    pub updated_at: DateTime<Utc>,
}

impl GitHubWorkflowRun {
    pub fn started_at(&self) -> DateTime<Utc> {
        self.run_started_at.unwrap_or(self.created_at)
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_success(&self) -> bool {
        self.conclusion == Some(Conclusion::Success)
    }

    pub fn is_failure(&self) -> bool {
        self.conclusion == Some(Conclusion::Failure)
    }

    /// Only runs that ended in success or failure take part in the statistics.
    pub fn is_admissible(&self) -> bool {
        self.is_success() || self.is_failure()
    }
}

/// Job within a GitHub Actions workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubJob {
    pub id: u64,
    pub name: String,
    pub conclusion: Option<Conclusion>,
    #[serde(default)]
    pub steps: Vec<GitHubStep>,
}

/// Step within a GitHub Actions job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubStep {
    pub name: String,
    pub conclusion: Option<Conclusion>,
}

/// A response body that carries one page of items.
pub trait Page: serde::de::DeserializeOwned {
    type Item;

    fn into_items(self) -> Vec<Self::Item>;
}

#[derive(Deserialize)]
pub struct WorkflowsPage {
    workflows: Vec<GitHubWorkflow>,
}

impl Page for WorkflowsPage {
    type Item = GitHubWorkflow;

    fn into_items(self) -> Vec<GitHubWorkflow> {
        self.workflows
    }
}

#[derive(Deserialize)]
pub struct WorkflowRunsPage {
    workflow_runs: Vec<GitHubWorkflowRun>,
}

impl Page for WorkflowRunsPage {
    type Item = GitHubWorkflowRun;

    fn into_items(self) -> Vec<GitHubWorkflowRun> {
        self.workflow_runs
    }
}

#[derive(Deserialize)]
pub struct JobsPage {
    jobs: Vec<GitHubJob>,
}

impl Page for JobsPage {
    type Item = GitHubJob;

    fn into_items(self) -> Vec<GitHubJob> {
        self.jobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_strips_directories() {
        let workflow = GitHubWorkflow {
            path: ".github/workflows/aks-byocni.yaml".to_string(),
        };
        assert_eq!(workflow.file_name(), "aks-byocni.yaml");
    }

    #[test]
    fn test_conclusion_deserializes_unknown_values() {
        let conclusion: Conclusion = serde_json::from_str("\"timed_out\"").unwrap();
        assert_eq!(conclusion, Conclusion::TimedOut);

        let conclusion: Conclusion = serde_json::from_str("\"something_new\"").unwrap();
        assert_eq!(conclusion, Conclusion::Unknown);
    }

    #[test]
    fn test_run_admissibility() {
        let json = r#"{
            "id": 7,
            "conclusion": null,
            "created_at": "2024-03-01T10:00:00Z",
            "updated_at": "2024-03-01T10:05:00Z"
        }"#;
        let mut run: GitHubWorkflowRun = serde_json::from_str(json).unwrap();
        assert!(!run.is_admissible());
        assert_eq!(run.started_at(), run.created_at);

        run.conclusion = Some(Conclusion::Cancelled);
        assert!(!run.is_admissible());

        run.conclusion = Some(Conclusion::Failure);
        assert!(run.is_admissible());
        assert!(run.is_failure());
    }
}
