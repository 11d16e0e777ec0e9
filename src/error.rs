use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("GitHub API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("No log location returned for job {job_id}")]
    MissingLogLocation { job_id: u64 },
}

pub type Result<T> = std::result::Result<T, DashboardError>;
