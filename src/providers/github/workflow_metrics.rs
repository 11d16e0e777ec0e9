use std::time::Duration;

use crate::insights::WindowStat;

use super::types::GitHubWorkflowRun;

const INITIAL_WINDOW: usize = 4;

/// Sizes of the trailing windows reported for `total` runs.
///
/// Starts at `min(4, total)` and doubles; the last size is clamped to `total` so the
/// largest window always covers every run.
pub(super) fn window_sizes(total: usize) -> Vec<usize> {
    let mut sizes = Vec::new();
    if total == 0 {
        return sizes;
    }

    let mut size = INITIAL_WINDOW.min(total);
    loop {
        sizes.push(size.min(total));
        if size >= total {
            break;
        }
        size *= 2;
    }
    sizes
}

/// Statistics for each trailing window of `runs`, which must be ordered newest first.
pub(super) fn window_stats(workflow: &str, runs: &[GitHubWorkflowRun]) -> Vec<WindowStat> {
    window_sizes(runs.len())
        .into_iter()
        .map(|size| calculate_window(workflow, &runs[..size]))
        .collect()
}

/// All fetched runs as one window. `None` for a workflow without runs.
pub(super) fn overall_stats(workflow: &str, runs: &[GitHubWorkflowRun]) -> Option<WindowStat> {
    (!runs.is_empty()).then(|| calculate_window(workflow, runs))
}

fn calculate_window(workflow: &str, window: &[GitHubWorkflowRun]) -> WindowStat {
    let successful: Vec<&GitHubWorkflowRun> = window.iter().filter(|r| r.is_success()).collect();
    let success_count = successful.len();
    let total_count = window.len();

    #[allow(clippy::cast_precision_loss)]
    let success_rate = if total_count > 0 {
        (success_count as f64 / total_count as f64) * 100.0
    } else {
        0.0
    };

    #[allow(clippy::cast_precision_loss)]
    let average_duration = (success_count > 0).then(|| {
        let total: f64 = successful
            .iter()
            .map(|run| run_duration(run).as_secs_f64())
            .sum();
        Duration::from_secs_f64(total / success_count as f64)
    });

    WindowStat {
        workflow: workflow.to_string(),
        window_size: total_count,
        from: window
            .last()
            .map(GitHubWorkflowRun::started_at)
            .unwrap_or_default(),
        to: window
            .first()
            .map(GitHubWorkflowRun::started_at)
            .unwrap_or_default(),
        success_count,
        total_count,
        success_rate,
        average_duration,
    }
}

fn run_duration(run: &GitHubWorkflowRun) -> Duration {
    (run.completed_at() - run.started_at())
        .to_std()
        .unwrap_or_default()
}

/// Lowest success rate first, truncated to `top`.
pub(super) fn rank_least_reliable(stats: &[WindowStat], top: usize) -> Vec<WindowStat> {
    let mut ranked = sorted_by_workflow(stats);
    ranked.sort_by(|a, b| a.success_rate.total_cmp(&b.success_rate));
    ranked.truncate(top);
    ranked
}

/// Longest average duration first, truncated to `top`.
///
/// Workflows without a successful run have no duration and rank last.
pub(super) fn rank_slowest(stats: &[WindowStat], top: usize) -> Vec<WindowStat> {
    let mut ranked = sorted_by_workflow(stats);
    ranked.sort_by(|a, b| b.average_duration.cmp(&a.average_duration));
    ranked.truncate(top);
    ranked
}

fn sorted_by_workflow(stats: &[WindowStat]) -> Vec<WindowStat> {
    let mut sorted = stats.to_vec();
    sorted.sort_by(|a, b| a.workflow.cmp(&b.workflow));
    sorted
}
