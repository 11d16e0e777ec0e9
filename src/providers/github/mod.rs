mod client;
mod drilldown;
mod links;
mod log_miner;
mod provider;
mod types;
mod workflow_metrics;

pub use links::hyperlink;
pub use provider::{DashboardOptions, GitHubProvider};
