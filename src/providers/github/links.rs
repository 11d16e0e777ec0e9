/// Builds the run-history page of a workflow, filtered by branch and trigger event.
///
/// # Arguments
///
/// * `web_url` - GitHub web base URL (e.g., <https://github.com>)
/// * `owner` - Repository owner/organization
/// * `repo` - Repository name
/// * `workflow` - Workflow file name (e.g., "ci.yaml")
///
/// # Returns
///
/// Clickable URL (e.g., <https://github.com/owner/repo/actions/workflows/ci.yaml?query=branch%3Amain+event%3Aschedule++>)
pub fn workflow_runs_url(
    web_url: &str,
    owner: &str,
    repo: &str,
    workflow: &str,
    branch: &str,
    event: &str,
) -> String {
    let web_url = web_url.trim_end_matches('/');
    format!("{web_url}/{owner}/{repo}/actions/workflows/{workflow}?query=branch%3A{branch}+event%3A{event}++")
}

/// Wraps `text` in an OSC 8 escape sequence so terminals render it as a link to `url`.
pub fn hyperlink(url: &str, text: &str) -> String {
    format!("\x1b]8;;{url}\x1b\\{text}\x1b]8;;\x1b\\")
}
