//! Command-line interface for hey-kafka

use anyhow::Context;
use clap::Parser;
use hey_kafka::{app, CliArgs, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();
    let config = Config::load(args).context("Invalid configuration")?;

    let delivery = app::run(&config).await?;
    println!("{}", app::success_report(&delivery));

    Ok(())
}
