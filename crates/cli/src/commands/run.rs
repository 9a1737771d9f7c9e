//! `run` command implementation.

use anyhow::{Context, Result};
use config_loader::{ConfigLoader, LoadedConfig};
use contracts::ServiceConfig;
use tracing::{info, warn};

use super::validate::{describe_source, ConfigSummary};
use crate::cli::RunArgs;
use crate::pipeline::Pipeline;

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs, loaded: LoadedConfig) -> Result<()> {
    let mut config = loaded.config;
    apply_cli_overrides(&mut config, args);
    ConfigLoader::validate(&config).context("Invalid configuration after CLI overrides")?;

    for warning in config_loader::warnings(&config) {
        warn!(%warning, "Configuration warning");
    }

    info!(
        source = %describe_source(loaded.source.as_deref()),
        feed = %config.feed.endpoint(),
        database = %config.database.url,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        println!("\n=== Configuration Summary ===\n");
        ConfigSummary::from(&config).print();
        println!();
        return Ok(());
    }

    let stats = Pipeline::new(config)
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    stats.print_summary();
    info!("adsb-ingest finished");
    Ok(())
}

fn apply_cli_overrides(config: &mut ServiceConfig, args: &RunArgs) {
    if let Some(ref host) = args.host {
        info!(host = %host, "Overriding feed host from CLI");
        config.feed.host = host.clone();
    }
    if let Some(port) = args.port {
        info!(port, "Overriding feed port from CLI");
        config.feed.port = port;
    }
    if let Some(ref url) = args.database_url {
        info!(url = %url, "Overriding database url from CLI");
        config.database.url = url.clone();
    }
}

/// Resolves on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed never resolves; the other one still works.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> RunArgs {
        RunArgs {
            host: None,
            port: None,
            database_url: None,
            metrics_port: 0,
            dry_run: true,
        }
    }

    #[test]
    fn test_overrides_replace_config_values() {
        let mut config = ServiceConfig::default();
        let args = RunArgs {
            host: Some("radar.local".to_string()),
            port: Some(30005),
            database_url: Some("sqlite://other.db".to_string()),
            ..args()
        };

        apply_cli_overrides(&mut config, &args);
        assert_eq!(config.feed.endpoint(), "radar.local:30005");
        assert_eq!(config.database.url, "sqlite://other.db");
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let mut config = ServiceConfig::default();
        apply_cli_overrides(&mut config, &args());
        assert_eq!(config.feed.endpoint(), "localhost:30003");
    }

    #[tokio::test]
    async fn test_dry_run_rejects_invalid_override() {
        let loaded = LoadedConfig {
            config: ServiceConfig::default(),
            source: None,
        };
        let args = RunArgs {
            port: Some(0),
            ..args()
        };
        assert!(run_pipeline(&args, loaded).await.is_err());
    }

    #[tokio::test]
    async fn test_dry_run_succeeds_without_connecting() {
        let loaded = LoadedConfig {
            config: ServiceConfig::default(),
            source: None,
        };
        assert!(run_pipeline(&args(), loaded).await.is_ok());
    }
}
