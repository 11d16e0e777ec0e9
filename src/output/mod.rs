mod dashboard;
mod progress;
mod styling;
mod tables;

pub use dashboard::print_report;
pub use progress::PhaseProgress;
use styling::{dim, magenta_bold};

/// Prints the `ci-dashboard` banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("📈 ci-dashboard"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("GitHub Actions Health Dashboard")
    );
}
