//! # adsb-ingest
//!
//! Command-line entry point.
//!
//! Provides:
//! - Configuration loading and validation
//! - Pipeline wiring and lifecycle management
//! - Graceful shutdown on Ctrl-C / SIGTERM

mod cli;
mod commands;
mod pipeline;

use anyhow::{Context, Result};
use clap::Parser;
use config_loader::{ConfigLoader, LoadedConfig};
use contracts::{ContractError, LoggingConfig};
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_pipeline, run_status, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // A broken file still gets logging; the command reports the error itself
    let loaded = ConfigLoader::load(cli.config.as_deref());
    init_observability(&cli, &loaded)?;

    info!(version = env!("CARGO_PKG_VERSION"), "adsb-ingest starting");

    let result = match &cli.command {
        Commands::Run(args) => {
            let loaded = loaded.context("Failed to load configuration")?;
            run_pipeline(args, loaded).await
        }
        Commands::Validate(args) => run_validate(args, cli.config.as_deref(), loaded),
        Commands::Status(args) => {
            let loaded = loaded.context("Failed to load configuration")?;
            run_status(args, loaded).await
        }
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// CLI flags first, then the `[logging]` section, then built-in defaults
fn init_observability(cli: &Cli, loaded: &Result<LoadedConfig, ContractError>) -> Result<()> {
    let logging = match loaded {
        Ok(loaded) => loaded.config.logging.clone(),
        Err(_) => LoggingConfig::default(),
    };

    let mut config = ObservabilityConfig::from_logging(&logging)
        .with_default_level(cli.log_level(&logging.level));
    if let Some(format) = cli.log_format {
        config = config.with_log_format(format.into());
    }
    if let Commands::Run(args) = &cli.command {
        if !args.dry_run {
            config = config.with_metrics_port(Some(args.metrics_port));
        }
    }

    observability::init_with_config(config)
}
