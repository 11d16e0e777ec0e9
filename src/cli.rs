use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use std::path::PathBuf;

use crate::auth::Token;
use crate::config::Config;
use crate::insights::DashboardReport;
use crate::output;
use crate::providers::{DashboardOptions, GitHubProvider};

#[derive(Parser)]
#[command(name = "ci-dashboard")]
#[command(author, version, about = "GitHub Actions health dashboard", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./ci-dashboard.toml and friends)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print debug logs
    #[arg(short, long, global = true, default_value_t = false)]
    pub debug: bool,
}

#[derive(Args)]
struct Repository {
    /// Repository owner or organization
    owner: String,

    /// Repository name
    repo: String,

    /// GitHub token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List workflows
    List {
        #[command(flatten)]
        repository: Repository,
    },
    /// Show CI dashboard
    Show {
        #[command(flatten)]
        repository: Repository,

        #[command(flatten)]
        options: ShowOptions,
    },
}

#[derive(Args)]
struct ShowOptions {
    /// Branch name [default: main]
    #[arg(short, long)]
    branch: Option<String>,

    /// Event type that triggered the workflows [default: schedule]
    #[arg(short, long)]
    event: Option<String>,

    /// The number of workflow runs to process [default: 64]
    #[arg(short, long)]
    number: Option<usize>,

    /// Limit workflow runs by the number of days [default: 30]
    #[arg(long)]
    days: Option<u32>,

    /// Workflow file name (e.g. aks-byocni.yaml); enables failure analysis
    #[arg(short, long)]
    workflow: Option<String>,

    /// Print summary
    #[arg(short, long, default_value_t = false)]
    summary: bool,

    /// Print top n. Use with --summary flag [default: 10]
    #[arg(short, long)]
    top: Option<usize>,

    /// Concurrent requests per stage [default: 30]
    #[arg(long)]
    workers: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(short, long, default_value_t = false)]
    pretty: bool,

    /// Write JSON output to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

impl ShowOptions {
    fn resolve(&self, config: &Config) -> DashboardOptions {
        let defaults = &config.dashboard;
        DashboardOptions {
            branch: self.branch.clone().unwrap_or_else(|| defaults.branch.clone()),
            event: self.event.clone().unwrap_or_else(|| defaults.event.clone()),
            runs: self.number.unwrap_or(defaults.number),
            days: self.days.unwrap_or(defaults.days),
            workflow: self.workflow.clone(),
            summary: self.summary,
            top: self.top.unwrap_or(defaults.top),
        }
    }
}

impl Cli {
    fn provider(&self, repository: &Repository, config: &Config, workers: usize) -> Result<GitHubProvider> {
        let token = Token::require(repository.token.as_deref())?;
        let provider = GitHubProvider::new(
            &config.github.api_url,
            &config.github.web_url,
            &repository.owner,
            &repository.repo,
            &token,
            workers,
        )?;
        Ok(provider)
    }

    async fn execute_list(&self, repository: &Repository, config: &Config) -> Result<()> {
        let provider = self.provider(repository, config, config.dashboard.workers)?;

        for workflow in provider.list_workflows().await {
            println!("{workflow}");
        }
        Ok(())
    }

    async fn execute_show(
        &self,
        repository: &Repository,
        options: &ShowOptions,
        config: &Config,
    ) -> Result<()> {
        let workers = options.workers.unwrap_or(config.dashboard.workers);
        let provider = self.provider(repository, config, workers)?;
        let dashboard_options = options.resolve(config);

        output::print_banner();
        let report = provider.collect_dashboard(&dashboard_options).await;

        match options.format {
            OutputFormat::Table => output::print_report(&report),
            OutputFormat::Json => write_json(&report, options.pretty, options.output.as_ref())?,
        }
        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;

        match &self.command {
            Commands::List { repository } => self.execute_list(repository, &config).await,
            Commands::Show {
                repository,
                options,
            } => {
                info!(
                    "Showing dashboard for {}/{}",
                    repository.owner, repository.repo
                );
                self.execute_show(repository, options, &config).await
            }
        }
    }
}

fn write_json(report: &DashboardReport, pretty: bool, path: Option<&PathBuf>) -> Result<()> {
    let json_output = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };

    if let Some(path) = path {
        std::fs::write(path, json_output)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!("Report written to: {}", path.display());
    } else {
        println!("{json_output}");
    }
    Ok(())
}
