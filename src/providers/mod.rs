mod github;

pub use github::{hyperlink, DashboardOptions, GitHubProvider};
