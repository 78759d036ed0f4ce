use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use conduit_cli::{
    cli::{Cli, Commands},
    commands,
};
use conduit_config::ConduitConfig;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries results and, for serve, the protocol.
    init_logging(cli.log_filter());

    let config = ConduitConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Call(args) => commands::call::execute(&config, args).await,
        Commands::Notify(args) => {
            commands::notify::execute(&config, args).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Serve => {
            commands::serve::execute(&config).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_logging(level: Option<LevelFilter>) {
    let filter = match level {
        Some(level) => EnvFilter::default().add_directive(level.into()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
