use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::pool::DEFAULT_WORKERS;

const CONFIG_FILE_NAMES: [&str; 4] = [
    "ci-dashboard.toml",
    "ci-dashboard.json",
    "ci-dashboard.yaml",
    "ci-dashboard.yml",
];

/// Configuration file structure for ci-dashboard.
///
/// Lets users keep repository-independent defaults (branch, event, run cap, ...)
/// instead of repeating them on every invocation. Command-line flags win over it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// GitHub endpoints
    #[serde(default)]
    pub github: GitHubConfig,

    /// Dashboard defaults
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitHubConfig {
    /// GitHub REST API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// GitHub web base URL, used for links in the report
    #[serde(default = "default_web_url")]
    pub web_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DashboardConfig {
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Event that triggered the workflow runs
    #[serde(default = "default_event")]
    pub event: String,

    /// Maximum number of workflow runs to process per workflow
    #[serde(default = "default_number")]
    pub number: usize,

    /// Only consider runs created within this many days
    #[serde(default = "default_days")]
    pub days: u32,

    /// Number of rows in summary rankings
    #[serde(default = "default_top")]
    pub top: usize,

    /// Concurrent requests per fan-out stage
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            web_url: default_web_url(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            branch: default_branch(),
            event: default_event(),
            number: default_number(),
            days: default_days(),
            top: default_top(),
            workers: default_workers(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_web_url() -> String {
    "https://github.com".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_event() -> String {
    "schedule".to_string()
}

fn default_number() -> usize {
    64
}

fn default_days() -> u32 {
    30
}

fn default_top() -> usize {
    10
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./ci-dashboard.{toml,json,yaml,yml}
    /// 3. `<config dir>/ci-dashboard/ci-dashboard.{toml,json,yaml,yml}`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if !path.exists() {
                log::warn!("Config file {} not found, using defaults", path.display());
                return Ok(Self::default());
            }
            return Self::load_from_path(path);
        }

        let mut search_dirs = vec![PathBuf::from(".")];
        if let Some(config_dir) = dirs::config_dir() {
            search_dirs.push(config_dir.join("ci-dashboard"));
        }

        match find_config_file(&search_dirs) {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        log::debug!("Loading config from {}", path.display());
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }
}

fn find_config_file(search_dirs: &[PathBuf]) -> Option<PathBuf> {
    search_dirs
        .iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}
