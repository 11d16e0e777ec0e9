use chrono::{DateTime, Duration, Utc};
use log::{error, info, warn};

use crate::auth::Token;
use crate::error::Result;
use crate::insights::{
    DashboardReport, FailureAnalysis, RankedWorkflow, SummaryReport, WindowStat, WorkflowReport,
};
use crate::output::PhaseProgress;
use crate::pool::WorkerPool;

use super::client::{GitHubClient, RunQuery};
use super::drilldown::drilldown;
use super::links::workflow_runs_url;
use super::log_miner::mine_logs;
use super::types::GitHubWorkflowRun;
use super::workflow_metrics::{overall_stats, rank_least_reliable, rank_slowest, window_stats};

/// What the dashboard should fetch and how to present it.
#[derive(Debug, Clone)]
pub struct DashboardOptions {
    pub branch: String,
    pub event: String,
    /// Maximum number of success/failure runs per workflow
    pub runs: usize,
    /// Only runs created within this many days are considered
    pub days: u32,
    /// Restrict to one workflow and analyze its failures
    pub workflow: Option<String>,
    pub summary: bool,
    pub top: usize,
}

/// Collects workflow health data for one GitHub repository.
pub struct GitHubProvider {
    client: GitHubClient,
    pool: WorkerPool,
    owner: String,
    repo: String,
    web_url: String,
}

impl GitHubProvider {
    /// Create a new GitHub Actions provider.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the API URL is invalid or the HTTP client cannot be built.
    pub fn new(
        api_url: &str,
        web_url: &str,
        owner: &str,
        repo: &str,
        token: &Token,
        workers: usize,
    ) -> Result<Self> {
        let client = GitHubClient::new(api_url, owner, repo, token)?;

        Ok(Self {
            client,
            pool: WorkerPool::new(workers),
            owner: owner.to_string(),
            repo: repo.to_string(),
            web_url: web_url.to_string(),
        })
    }

    /// Lists workflow file names of the repository.
    ///
    /// A listing that fails part-way is logged and the workflows seen so far are returned.
    pub async fn list_workflows(&self) -> Vec<String> {
        let fetched = self.client.list_workflows().await;
        if let Some(e) = &fetched.error {
            error!(
                "Failed to list workflows of {}/{}: {e}",
                self.owner, self.repo
            );
        }
        fetched.items
    }

    /// Fetches runs for the selected workflows and builds the dashboard report.
    ///
    /// Workflows, runs, jobs and logs are fetched in three fan-out stages; items that fail
    /// to load are logged and left out of the report.
    pub async fn collect_dashboard(&self, options: &DashboardOptions) -> DashboardReport {
        info!(
            "Collecting dashboard for {}/{} (branch: {}, event: {})",
            self.owner, self.repo, options.branch, options.event
        );

        let progress = PhaseProgress::start_phase_1();
        let workflows = match &options.workflow {
            Some(workflow) => vec![workflow.clone()],
            None => self.list_workflows().await,
        };

        let progress = progress.finish_phase_1_start_phase_2(workflows.len());
        let query = RunQuery {
            branch: options.branch.clone(),
            event: options.event.clone(),
            created_after: created_after(Utc::now(), options.days),
            limit: options.runs,
        };
        let runs_by_workflow = self
            .pool
            .dispatch("runs", workflows, |workflow| {
                let query = &query;
                async move {
                    self.client
                        .fetch_workflow_runs(&workflow, query)
                        .await
                        .into_result()
                }
            })
            .await;

        let mut runs_by_workflow: Vec<(String, Vec<GitHubWorkflowRun>)> =
            runs_by_workflow.into_iter().collect();
        runs_by_workflow.sort_by(|a, b| a.0.cmp(&b.0));

        let progress = progress.finish_phase_2_start_phase_3();
        let report = if options.summary {
            DashboardReport::Summary(self.summarize(&runs_by_workflow, options))
        } else {
            let mut reports = Vec::with_capacity(runs_by_workflow.len());
            for (workflow, runs) in &runs_by_workflow {
                let failures = if options.workflow.is_some() {
                    Some(self.analyze_failures(runs).await)
                } else {
                    None
                };
                reports.push(WorkflowReport {
                    workflow: workflow.clone(),
                    url: self.workflow_url(workflow, options),
                    windows: window_stats(workflow, runs),
                    failures,
                });
            }
            DashboardReport::Workflows { workflows: reports }
        };
        progress.finish_phase_3();

        report
    }

    fn summarize(
        &self,
        runs_by_workflow: &[(String, Vec<GitHubWorkflowRun>)],
        options: &DashboardOptions,
    ) -> SummaryReport {
        let overall: Vec<WindowStat> = runs_by_workflow
            .iter()
            .filter_map(|(workflow, runs)| {
                let stats = overall_stats(workflow, runs);
                if stats.is_none() {
                    warn!("No runs found for {workflow}; excluded from ranking");
                }
                stats
            })
            .collect();

        let attach_url = |stats: WindowStat| RankedWorkflow {
            url: self.workflow_url(&stats.workflow, options),
            stats,
        };

        SummaryReport {
            least_reliable: rank_least_reliable(&overall, options.top)
                .into_iter()
                .map(attach_url)
                .collect(),
            slowest: rank_slowest(&overall, options.top)
                .into_iter()
                .map(attach_url)
                .collect(),
        }
    }

    async fn analyze_failures(&self, runs: &[GitHubWorkflowRun]) -> FailureAnalysis {
        let breakdown = drilldown(&self.client, &self.pool, runs).await;
        let logs = mine_logs(&self.client, &self.pool, &breakdown.log_urls).await;
        FailureAnalysis { breakdown, logs }
    }

    fn workflow_url(&self, workflow: &str, options: &DashboardOptions) -> String {
        workflow_runs_url(
            &self.web_url,
            &self.owner,
            &self.repo,
            workflow,
            &options.branch,
            &options.event,
        )
    }
}

/// Lower bound for run creation time when looking back `days` days from `now`.
fn created_after(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now - Duration::days(i64::from(days))
}
