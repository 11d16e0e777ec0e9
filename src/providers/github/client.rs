use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LINK, LOCATION};
use reqwest::{redirect, Client, Response};
use url::Url;

use crate::auth::Token;
use crate::error::{DashboardError, Result};

use super::types::{
    GitHubJob, GitHubWorkflowRun, JobsPage, Page, WorkflowRunsPage, WorkflowsPage,
};

const PER_PAGE: &str = "100";
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("ci-dashboard/", env!("CARGO_PKG_VERSION"));

/// Items collected by a paged fetch, plus the error that stopped it early, if any.
///
/// A failing page does not discard the pages that came before it.
#[derive(Debug)]
pub struct Fetched<T> {
    pub items: Vec<T>,
    pub error: Option<DashboardError>,
}

impl<T> Fetched<T> {
    fn complete(items: Vec<T>) -> Self {
        Self { items, error: None }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Fetched<U> {
        Fetched {
            items: self.items.into_iter().map(f).collect(),
            error: self.error,
        }
    }

    /// Treats a partial fetch as a failure of the whole item.
    pub fn into_result(self) -> Result<Vec<T>> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.items),
        }
    }
}

/// Remote-side filters for listing runs of one workflow.
#[derive(Debug, Clone)]
pub struct RunQuery {
    pub branch: String,
    pub event: String,
    /// Lower bound on the run creation time
    pub created_after: DateTime<Utc>,
    /// Maximum number of success/failure runs to keep
    pub limit: usize,
}

/// GitHub REST client for workflow, run, job and log data.
#[derive(Clone)]
pub struct GitHubClient {
    /// Authenticated client for the REST API
    api: Client,
    /// Authenticated client that never follows redirects, for log locations
    log_locations: Client,
    /// Unauthenticated client for pre-signed log URLs
    downloads: Client,
    api_url: Url,
    owner: String,
    repo: String,
}

impl GitHubClient {
    /// Create a new GitHub API client.
    ///
    /// # Arguments
    ///
    /// * `api_url` - GitHub API base URL (e.g., "https://api.github.com")
    /// * `owner` - Repository owner/organization
    /// * `repo` - Repository name
    /// * `token` - GitHub token sent as a bearer credential
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(api_url: &str, owner: &str, repo: &str, token: &Token) -> Result<Self> {
        let mut api_url = Url::parse(api_url)
            .map_err(|e| DashboardError::Config(format!("Invalid API URL: {e}")))?;
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
            .map_err(|_| DashboardError::Config("Token contains invalid characters".into()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));

        let api = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers.clone())
            .build()
            .map_err(|e| DashboardError::Config(format!("Failed to create HTTP client: {e}")))?;

        let log_locations = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| DashboardError::Config(format!("Failed to create HTTP client: {e}")))?;

        let downloads = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DashboardError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            api,
            log_locations,
            downloads,
            api_url,
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    fn repo_url(&self, path: &str) -> Result<Url> {
        let mut url = self
            .api_url
            .join(&format!("repos/{}/{}/{path}", self.owner, self.repo))?;
        url.query_pairs_mut().append_pair("per_page", PER_PAGE);
        Ok(url)
    }

    /// Lists the file names of every workflow in the repository, sorted.
    pub async fn list_workflows(&self) -> Fetched<String> {
        let url = match self.repo_url("actions/workflows") {
            Ok(url) => url,
            Err(error) => return Fetched { items: Vec::new(), error: Some(error) },
        };

        let mut fetched = self
            .paginate::<WorkflowsPage>(url, None, |_| true)
            .await
            .map(|workflow| workflow.file_name().to_string());
        fetched.items.sort();
        fetched
    }

    /// Fetches the most recent success/failure runs of one workflow, newest first.
    ///
    /// Branch, event and creation-time filtering happen on the remote side; runs with
    /// any other conclusion are dropped here and do not count towards `query.limit`.
    pub async fn fetch_workflow_runs(
        &self,
        workflow: &str,
        query: &RunQuery,
    ) -> Fetched<GitHubWorkflowRun> {
        let mut url = match self.repo_url(&format!("actions/workflows/{workflow}/runs")) {
            Ok(url) => url,
            Err(error) => return Fetched { items: Vec::new(), error: Some(error) },
        };
        url.query_pairs_mut()
            .append_pair("branch", &query.branch)
            .append_pair("event", &query.event)
            .append_pair("created", &created_filter(query.created_after));

        self.paginate::<WorkflowRunsPage>(url, Some(query.limit), GitHubWorkflowRun::is_admissible)
            .await
    }

    /// Fetches every job of a workflow run.
    pub async fn fetch_jobs(&self, run_id: u64) -> Fetched<GitHubJob> {
        match self.repo_url(&format!("actions/runs/{run_id}/jobs")) {
            Ok(url) => self.paginate::<JobsPage>(url, None, |_| true).await,
            Err(error) => Fetched { items: Vec::new(), error: Some(error) },
        }
    }

    /// Resolves the download location of a job's raw log.
    ///
    /// GitHub answers with a redirect to a short-lived, pre-signed URL.
    pub async fn job_log_url(&self, job_id: u64) -> Result<Url> {
        let url = self
            .api_url
            .join(&format!("repos/{}/{}/actions/jobs/{job_id}/logs", self.owner, self.repo))?;
        debug!("GET {url}");

        let response = self.log_locations.get(url).send().await?;
        if !response.status().is_redirection() {
            check_status(response).await?;
            return Err(DashboardError::MissingLogLocation { job_id });
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(DashboardError::MissingLogLocation { job_id })?;
        Ok(Url::parse(location)?)
    }

    /// Downloads a raw log body from a location returned by [`Self::job_log_url`].
    pub async fn download_log(&self, url: &Url) -> Result<String> {
        debug!("Downloading log from {url}");
        let response = self.downloads.get(url.clone()).send().await?;
        let response = check_status(response).await?;
        Ok(response.text().await?)
    }

    /// Follows `rel="next"` links until the pages run out or `limit` admitted items are held.
    async fn paginate<P: Page>(
        &self,
        first: Url,
        limit: Option<usize>,
        admit: impl Fn(&P::Item) -> bool,
    ) -> Fetched<P::Item> {
        let mut items = Vec::new();
        let mut next = Some(first);

        while let Some(url) = next.take() {
            let (page, next_url) = match self.fetch_page::<P>(url).await {
                Ok(fetched) => fetched,
                Err(error) => {
                    return Fetched {
                        items,
                        error: Some(error),
                    }
                }
            };

            items.extend(page.into_items().into_iter().filter(|item| admit(item)));

            if limit.is_some_and(|limit| items.len() >= limit) {
                break;
            }
            next = next_url;
        }

        if let Some(limit) = limit {
            items.truncate(limit);
        }
        Fetched::complete(items)
    }

    async fn fetch_page<P: Page>(&self, url: Url) -> Result<(P, Option<Url>)> {
        debug!("GET {url}");
        let response = self.api.get(url).send().await?;
        let response = check_status(response).await?;
        let next = next_page_url(response.headers());
        let body = response.bytes().await?;
        Ok((serde_json::from_slice(&body)?, next))
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());
    Err(DashboardError::Api {
        status: status.as_u16(),
        message,
    })
}

fn created_filter(since: DateTime<Utc>) -> String {
    format!(">={}", since.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Extracts the `rel="next"` target from a `Link` header.
fn next_page_url(headers: &HeaderMap) -> Option<Url> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts
            .next()?
            .trim()
            .strip_prefix('<')?
            .strip_suffix('>')?;
        if parts.any(|param| param.trim() == r#"rel="next""#) {
            Url::parse(target).ok()
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mockito::{Matcher, Server};

    fn client(server: &Server) -> GitHubClient {
        GitHubClient::new(&server.url(), "cilium", "cilium", &Token::from("test-token")).unwrap()
    }

    fn run_json(id: u64, conclusion: &str) -> String {
        format!(
            r#"{{"id": {id}, "conclusion": {conclusion}, "created_at": "2024-03-01T10:00:00Z",
                "run_started_at": "2024-03-01T10:00:00Z", "updated_at": "2024-03-01T10:10:00Z"}}"#
        )
    }

    fn query(limit: usize) -> RunQuery {
        RunQuery {
            branch: "main".to_string(),
            event: "schedule".to_string(),
            created_after: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
            limit,
        }
    }

    #[test]
    fn test_next_page_url() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LINK,
            HeaderValue::from_static(
                r#"<https://api.github.com/x?page=2>; rel="next", <https://api.github.com/x?page=9>; rel="last""#,
            ),
        );
        assert_eq!(
            next_page_url(&headers).unwrap().as_str(),
            "https://api.github.com/x?page=2"
        );
    }

    #[test]
    fn test_next_page_url_absent_on_last_page() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LINK,
            HeaderValue::from_static(r#"<https://api.github.com/x?page=1>; rel="first""#),
        );
        assert!(next_page_url(&headers).is_none());
        assert!(next_page_url(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_created_filter_format() {
        let since = Utc.with_ymd_and_hms(2024, 2, 1, 8, 30, 0).unwrap();
        assert_eq!(created_filter(since), ">=2024-02-01T08:30:00Z");
    }

    #[tokio::test]
    async fn test_list_workflows_follows_pages_and_sorts() {
        let mut server = Server::new_async().await;
        let next = format!(
            "<{}/repos/cilium/cilium/actions/workflows?page=2>; rel=\"next\"",
            server.url()
        );
        let first = server
            .mock("GET", "/repos/cilium/cilium/actions/workflows")
            .match_query(Matcher::UrlEncoded("per_page".into(), "100".into()))
            .match_header("authorization", "Bearer test-token")
            .with_header("link", &next)
            .with_body(r#"{"workflows": [{"id": 1, "name": "Zeta", "path": ".github/workflows/zeta.yaml"}]}"#)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/repos/cilium/cilium/actions/workflows")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_body(r#"{"workflows": [{"id": 2, "name": "Alpha", "path": ".github/workflows/alpha.yml"}]}"#)
            .create_async()
            .await;

        let fetched = client(&server).list_workflows().await;

        first.assert_async().await;
        second.assert_async().await;
        assert!(fetched.error.is_none());
        assert_eq!(fetched.items, vec!["alpha.yml", "zeta.yaml"]);
    }

    #[tokio::test]
    async fn test_list_workflows_follows_moved_repository() {
        let mut server = Server::new_async().await;
        let moved = format!("{}/repositories/123/actions/workflows?per_page=100", server.url());
        let old = server
            .mock("GET", "/repos/cilium/cilium/actions/workflows")
            .match_query(Matcher::Any)
            .with_status(301)
            .with_header("location", &moved)
            .create_async()
            .await;
        let new = server
            .mock("GET", "/repositories/123/actions/workflows")
            .match_query(Matcher::Any)
            .match_header("authorization", "Bearer test-token")
            .with_body(r#"{"workflows": [{"id": 1, "name": "CI", "path": ".github/workflows/ci.yaml"}]}"#)
            .create_async()
            .await;

        let fetched = client(&server).list_workflows().await;

        old.assert_async().await;
        new.assert_async().await;
        assert!(fetched.error.is_none());
        assert_eq!(fetched.items, vec!["ci.yaml"]);
    }

    #[tokio::test]
    async fn test_fetch_runs_sends_filters_and_skips_other_conclusions() {
        let mut server = Server::new_async().await;
        let body = format!(
            r#"{{"workflow_runs": [{}, {}, {}, {}]}}"#,
            run_json(4, "\"success\""),
            run_json(3, "\"cancelled\""),
            run_json(2, "null"),
            run_json(1, "\"failure\""),
        );
        let mock = server
            .mock("GET", "/repos/cilium/cilium/actions/workflows/ci.yaml/runs")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("branch".into(), "main".into()),
                Matcher::UrlEncoded("event".into(), "schedule".into()),
                Matcher::UrlEncoded("created".into(), ">=2024-02-01T00:00:00Z".into()),
            ]))
            .with_body(body)
            .create_async()
            .await;

        let fetched = client(&server).fetch_workflow_runs("ci.yaml", &query(64)).await;

        mock.assert_async().await;
        let ids: Vec<u64> = fetched.into_result().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![4, 1]);
    }

    #[tokio::test]
    async fn test_fetch_runs_stops_at_limit_and_truncates() {
        let mut server = Server::new_async().await;
        let next = format!(
            "<{}/repos/cilium/cilium/actions/workflows/ci.yaml/runs?page=2>; rel=\"next\"",
            server.url()
        );
        let body = format!(
            r#"{{"workflow_runs": [{}, {}, {}]}}"#,
            run_json(3, "\"success\""),
            run_json(2, "\"failure\""),
            run_json(1, "\"success\""),
        );
        server
            .mock("GET", "/repos/cilium/cilium/actions/workflows/ci.yaml/runs")
            .match_query(Matcher::UrlEncoded("per_page".into(), "100".into()))
            .with_header("link", &next)
            .with_body(body)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/repos/cilium/cilium/actions/workflows/ci.yaml/runs")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_body(r#"{"workflow_runs": []}"#)
            .expect(0)
            .create_async()
            .await;

        let runs = client(&server)
            .fetch_workflow_runs("ci.yaml", &query(2))
            .await
            .into_result()
            .unwrap();

        second.assert_async().await;
        assert_eq!(runs.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3, 2]);
    }

    #[tokio::test]
    async fn test_fetch_jobs_keeps_partial_results_on_error() {
        let mut server = Server::new_async().await;
        let next = format!(
            "<{}/repos/cilium/cilium/actions/runs/42/jobs?page=2>; rel=\"next\"",
            server.url()
        );
        server
            .mock("GET", "/repos/cilium/cilium/actions/runs/42/jobs")
            .match_query(Matcher::UrlEncoded("per_page".into(), "100".into()))
            .with_header("link", &next)
            .with_body(r#"{"jobs": [{"id": 1, "name": "build", "conclusion": "success", "steps": []}]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/repos/cilium/cilium/actions/runs/42/jobs")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let fetched = client(&server).fetch_jobs(42).await;

        assert_eq!(fetched.items.len(), 1);
        assert!(matches!(
            fetched.error,
            Some(DashboardError::Api { status: 502, .. })
        ));
        assert!(fetched.into_result().is_err());
    }

    #[tokio::test]
    async fn test_job_log_url_reads_redirect_location() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/repos/cilium/cilium/actions/jobs/9/logs")
            .with_status(302)
            .with_header("location", "https://logs.example.com/job/9?sig=abc")
            .create_async()
            .await;

        let url = client(&server).job_log_url(9).await.unwrap();
        assert_eq!(url.as_str(), "https://logs.example.com/job/9?sig=abc");
    }

    #[tokio::test]
    async fn test_job_log_url_reports_api_errors() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/repos/cilium/cilium/actions/jobs/9/logs")
            .with_status(410)
            .with_body("gone")
            .create_async()
            .await;

        let result = client(&server).job_log_url(9).await;
        assert!(matches!(result, Err(DashboardError::Api { status: 410, .. })));
    }

    #[tokio::test]
    async fn test_download_log_returns_body() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/logs/9")
            .with_body("line one\nline two\n")
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/logs/9", server.url())).unwrap();
        let body = client(&server).download_log(&url).await.unwrap();
        assert_eq!(body, "line one\nline two\n");
    }
}
