use std::fmt::Write;

use chrono::{DateTime, Utc};
use comfy_table::Cell;
use console::Term;

use crate::insights::{
    DashboardReport, FailureAnalysis, FrequencyTable, RankedWorkflow, SummaryReport,
    WorkflowReport,
};
use crate::providers::hyperlink;

use super::styling::{bold, bright, bright_red, bright_yellow, cyan_bold, cyan_underlined};
use super::tables::{
    color_coded_success_cell, count_cell, create_plain_table, create_table, duration_cell,
    header_cells,
};

const DATE_TIME: &str = "%Y-%m-%d %H:%M:%S";
const DATE_ONLY: &str = "%Y-%m-%d";

/// Prints the dashboard to stdout.
///
/// Workflow names in the summary become clickable links when stdout is a terminal.
pub fn print_report(report: &DashboardReport) {
    let hyperlinks = Term::stdout().is_term();
    print!("{}", render_report(report, hyperlinks));
}

pub fn render_report(report: &DashboardReport, hyperlinks: bool) -> String {
    let mut output = String::new();
    match report {
        DashboardReport::Summary(summary) => render_summary(&mut output, summary, hyperlinks),
        DashboardReport::Workflows { workflows } => {
            if workflows.is_empty() {
                let _ = writeln!(output, "{}", bright_yellow("No workflow data found."));
            }
            for workflow in workflows {
                render_workflow(&mut output, workflow);
            }
        }
    }
    output
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

fn format_date(time: &DateTime<Utc>, format: &str) -> String {
    time.format(format).to_string()
}

fn render_workflow(output: &mut String, report: &WorkflowReport) {
    let _ = writeln!(
        output,
        "{} {}",
        bold(&report.workflow),
        cyan_underlined(&report.url)
    );
    if report.windows.is_empty() {
        let _ = writeln!(output);
        return;
    }

    let mut table = create_table();
    table.set_header(header_cells(&["From", "To", "Duration", "Success Rate", "Runs"]));
    for window in &report.windows {
        table.add_row(vec![
            Cell::new(format_date(&window.from, DATE_TIME)),
            Cell::new(format_date(&window.to, DATE_TIME)),
            duration_cell(window.average_duration),
            color_coded_success_cell(window.success_rate),
            Cell::new(format!("{}/{}", window.success_count, window.total_count)),
        ]);
    }
    let _ = writeln!(output, "{table}\n");

    if let Some(failures) = &report.failures {
        render_failures(output, failures);
    }
}

fn render_failures(output: &mut String, failures: &FailureAnalysis) {
    let breakdown = &failures.breakdown;
    let logs = &failures.logs;
    render_counts(output, "failed jobs", "Job Name", "Failure Count", &breakdown.failed_jobs);
    render_counts(output, "failed steps", "Step Name", "Failure Count", &breakdown.failed_steps);
    render_counts(
        output,
        "cancelled steps",
        "Step Name",
        "Cancellation Count",
        &breakdown.cancelled_steps,
    );
    render_counts(output, "failed tests", "Test Name", "Failure Count", &logs.failed_tests);
    render_counts(output, "error logs", "Error Message", "Count", &logs.error_messages);
}

fn render_counts(output: &mut String, title: &str, name: &str, count: &str, table: &FrequencyTable) {
    if table.is_empty() {
        return;
    }

    let _ = writeln!(output, "{}", bright_red(title).bold());
    let mut rendered = create_table();
    rendered.set_header(header_cells(&[name, count]));
    for (key, occurrences) in table.sorted() {
        rendered.add_row(vec![Cell::new(key), count_cell(occurrences)]);
    }
    let _ = writeln!(output, "{rendered}\n");
}

fn render_summary(output: &mut String, summary: &SummaryReport, hyperlinks: bool) {
    if summary.least_reliable.is_empty() {
        let _ = writeln!(output, "{}", bright_yellow("No workflow runs found."));
        return;
    }

    add_section_header(output, "🚨", "Lowest Success Rate");
    let mut table = create_plain_table();
    table.set_header(header_cells(&["From", "To", "Success Rate", "Runs", "Workflow"]));
    for ranked in &summary.least_reliable {
        let stats = &ranked.stats;
        table.add_row(vec![
            Cell::new(format_date(&stats.from, DATE_ONLY)),
            Cell::new(format_date(&stats.to, DATE_ONLY)),
            color_coded_success_cell(stats.success_rate),
            Cell::new(format!("{}/{}", stats.success_count, stats.total_count)),
            Cell::new(workflow_label(ranked, hyperlinks)),
        ]);
    }
    let _ = writeln!(output, "{table}\n");

    add_section_header(output, "🐢", "Slowest Workflows");
    let mut table = create_plain_table();
    table.set_header(header_cells(&["From", "To", "Average Duration", "Runs", "Workflow"]));
    for ranked in &summary.slowest {
        let stats = &ranked.stats;
        table.add_row(vec![
            Cell::new(format_date(&stats.from, DATE_ONLY)),
            Cell::new(format_date(&stats.to, DATE_ONLY)),
            duration_cell(stats.average_duration),
            Cell::new(format!("{}/{}", stats.success_count, stats.total_count)),
            Cell::new(workflow_label(ranked, hyperlinks)),
        ]);
    }
    let _ = writeln!(output, "{table}");
}

fn workflow_label(ranked: &RankedWorkflow, hyperlinks: bool) -> String {
    if hyperlinks {
        cyan_bold(hyperlink(&ranked.url, &ranked.stats.workflow)).to_string()
    } else {
        ranked.stats.workflow.clone()
    }
}
