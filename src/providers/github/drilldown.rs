use log::{debug, info};
use url::Url;

use crate::error::Result;
use crate::insights::FailureBreakdown;
use crate::pool::WorkerPool;

use super::client::GitHubClient;
use super::types::{Conclusion, GitHubJob, GitHubWorkflowRun};

/// Failed jobs of one run, with the log locations that could be resolved for them.
#[derive(Debug)]
struct FailedRun {
    jobs: Vec<GitHubJob>,
    log_urls: Vec<Url>,
}

/// Fetches the jobs of every failed run and counts failing jobs and steps.
///
/// A run whose jobs cannot be fetched is left out entirely. A failed job whose log
/// location cannot be resolved is still counted.
pub(super) async fn drilldown(
    client: &GitHubClient,
    pool: &WorkerPool,
    runs: &[GitHubWorkflowRun],
) -> FailureBreakdown {
    let failed_runs: Vec<u64> = runs.iter().filter(|r| r.is_failure()).map(|r| r.id).collect();
    info!("Analyzing jobs of {} failed runs", failed_runs.len());

    let results = pool
        .dispatch("jobs", failed_runs.iter().copied(), |run_id| {
            fetch_failed_run(client, run_id)
        })
        .await;

    let mut breakdown = FailureBreakdown::default();
    for run_id in &failed_runs {
        if let Some(failed) = results.get(run_id) {
            record_failed_run(&mut breakdown, failed);
        }
    }
    breakdown
}

async fn fetch_failed_run(client: &GitHubClient, run_id: u64) -> Result<FailedRun> {
    let jobs: Vec<GitHubJob> = client
        .fetch_jobs(run_id)
        .await
        .into_result()?
        .into_iter()
        .filter(|job| job.conclusion == Some(Conclusion::Failure))
        .collect();

    let mut log_urls = Vec::with_capacity(jobs.len());
    for job in &jobs {
        match client.job_log_url(job.id).await {
            Ok(url) => log_urls.push(url),
            Err(e) => debug!("No log location for job {}: {e}", job.id),
        }
    }

    Ok(FailedRun { jobs, log_urls })
}

fn record_failed_run(breakdown: &mut FailureBreakdown, failed: &FailedRun) {
    for job in &failed.jobs {
        record_failed_job(breakdown, job);
    }
    breakdown.log_urls.extend(failed.log_urls.iter().cloned());
}

fn record_failed_job(breakdown: &mut FailureBreakdown, job: &GitHubJob) {
    breakdown.failed_jobs.increment(&job.name);
    for step in &job.steps {
        match step.conclusion {
            Some(Conclusion::Failure) => breakdown.failed_steps.increment(&step.name),
            Some(Conclusion::Cancelled) => breakdown.cancelled_steps.increment(&step.name),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Token;
    use crate::providers::github::types::GitHubStep;
    use crate::providers::github::workflow_metrics::tests::run;
    use mockito::{Matcher, Server};

    fn step(name: &str, conclusion: Option<Conclusion>) -> GitHubStep {
        GitHubStep {
            name: name.to_string(),
            conclusion,
        }
    }

    #[test]
    fn test_record_failed_job_classifies_steps() {
        let job = GitHubJob {
            id: 1,
            name: "e2e".to_string(),
            conclusion: Some(Conclusion::Failure),
            steps: vec![
                step("checkout", Some(Conclusion::Success)),
                step("run tests", Some(Conclusion::Failure)),
                step("upload", Some(Conclusion::Cancelled)),
                step("cleanup", Some(Conclusion::Skipped)),
                step("pending", None),
            ],
        };

        let mut breakdown = FailureBreakdown::default();
        record_failed_job(&mut breakdown, &job);
        record_failed_job(&mut breakdown, &job);

        assert_eq!(breakdown.failed_jobs.get("e2e"), 2);
        assert_eq!(breakdown.failed_steps.get("run tests"), 2);
        assert_eq!(breakdown.failed_steps.sorted().len(), 1);
        assert_eq!(breakdown.cancelled_steps.get("upload"), 2);
        assert_eq!(breakdown.cancelled_steps.sorted().len(), 1);
    }

    #[tokio::test]
    async fn test_drilldown_only_inspects_failed_runs() {
        let mut server = Server::new_async().await;
        let jobs_body = r#"{"jobs": [
            {"id": 11, "name": "build", "conclusion": "success", "steps": []},
            {"id": 12, "name": "e2e", "conclusion": "failure",
             "steps": [{"name": "run tests", "conclusion": "failure"},
                       {"name": "collect", "conclusion": "cancelled"}]},
            {"id": 13, "name": "lint", "conclusion": "cancelled",
             "steps": [{"name": "golangci", "conclusion": "cancelled"}]}
        ]}"#;
        let failed_jobs = server
            .mock("GET", "/repos/o/r/actions/runs/2/jobs")
            .match_query(Matcher::Any)
            .with_body(jobs_body)
            .create_async()
            .await;
        let passed_jobs = server
            .mock("GET", "/repos/o/r/actions/runs/1/jobs")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        server
            .mock("GET", "/repos/o/r/actions/jobs/12/logs")
            .with_status(302)
            .with_header("location", "https://logs.example.com/12")
            .create_async()
            .await;

        let client =
            GitHubClient::new(&server.url(), "o", "r", &Token::from("t")).unwrap();
        let runs = vec![run(2, false, 0, 30), run(1, true, 1, 30)];

        let breakdown = drilldown(&client, &WorkerPool::new(4), &runs).await;

        failed_jobs.assert_async().await;
        passed_jobs.assert_async().await;
        assert_eq!(breakdown.failed_jobs.sorted(), vec![("e2e", 1)]);
        assert_eq!(breakdown.failed_steps.sorted(), vec![("run tests", 1)]);
        assert_eq!(breakdown.cancelled_steps.sorted(), vec![("collect", 1)]);
        assert_eq!(
            breakdown.log_urls,
            vec![Url::parse("https://logs.example.com/12").unwrap()]
        );
    }

    #[tokio::test]
    async fn test_drilldown_counts_job_without_log_location() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/repos/o/r/actions/runs/5/jobs")
            .match_query(Matcher::Any)
            .with_body(r#"{"jobs": [{"id": 50, "name": "e2e", "conclusion": "failure", "steps": []}]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/repos/o/r/actions/jobs/50/logs")
            .with_status(404)
            .create_async()
            .await;

        let client =
            GitHubClient::new(&server.url(), "o", "r", &Token::from("t")).unwrap();
        let breakdown = drilldown(&client, &WorkerPool::new(2), &[run(5, false, 0, 10)]).await;

        assert_eq!(breakdown.failed_jobs.get("e2e"), 1);
        assert!(breakdown.log_urls.is_empty());
    }

    #[tokio::test]
    async fn test_drilldown_skips_runs_whose_jobs_fail_to_load() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/repos/o/r/actions/runs/7/jobs")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;
        server
            .mock("GET", "/repos/o/r/actions/runs/8/jobs")
            .match_query(Matcher::Any)
            .with_body(r#"{"jobs": [{"id": 80, "name": "unit", "conclusion": "failure", "steps": []}]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/repos/o/r/actions/jobs/80/logs")
            .with_status(302)
            .with_header("location", "https://logs.example.com/80")
            .create_async()
            .await;

        let client =
            GitHubClient::new(&server.url(), "o", "r", &Token::from("t")).unwrap();
        let runs = vec![run(8, false, 0, 10), run(7, false, 1, 10)];
        let breakdown = drilldown(&client, &WorkerPool::new(2), &runs).await;

        assert_eq!(breakdown.failed_jobs.sorted(), vec![("unit", 1)]);
        assert_eq!(breakdown.log_urls.len(), 1);
    }
}
