mod auth;
mod cli;
mod config;
mod error;
mod insights;
mod manifest;
mod providers;
mod server;
mod tools;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    // A local .env is optional
    dotenv::dotenv().ok();
    // Stdout carries protocol traffic, so env_logger writes to stderr
    env_logger::init();

    let cli = Cli::parse();
    info!("Starting glinsights - GitLab analytics tools");
    cli.execute().await?;

    Ok(())
}
