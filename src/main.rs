mod auth;
mod cli;
mod config;
mod error;
mod insights;
mod output;
mod pool;
mod providers;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    info!("Starting ci-dashboard");
    cli.execute().await?;

    Ok(())
}
