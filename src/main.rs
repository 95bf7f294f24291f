//! Scout CLI entry point.

use anyhow::Result;
use clap::Parser;
use scout::cli::{commands, log_level, Cli, Commands};
use scout::config::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load API keys from .env before anything reads the environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.as_ref().map(PathBuf::from);
    let settings = Settings::load_from(config_path.as_ref())?;

    // Initialize logging
    let level = log_level(cli.verbose, &settings.general.log_level);
    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("scout={}", level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match &cli.command {
        Commands::Run => {
            commands::run_batch(settings).await?;
        }

        Commands::Ask {
            question,
            model,
            steps,
        } => {
            commands::run_ask(question, model.clone(), *steps, settings).await?;
        }

        Commands::Chat { model } => {
            commands::run_chat(model.clone(), settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host.clone(), *port, settings).await?;
        }

        Commands::Search { query, limit } => {
            commands::run_search(query, *limit, settings).await?;
        }

        Commands::Sources => {
            commands::run_sources(settings).await?;
        }

        Commands::Tools => {
            commands::run_tools();
        }

        Commands::Doctor => {
            commands::run_doctor(config_path, &settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, config_path, settings)?;
        }
    }

    Ok(())
}
