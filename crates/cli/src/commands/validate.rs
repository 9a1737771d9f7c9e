//! `validate` command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use config_loader::LoadedConfig;
use contracts::{ContractError, ServiceConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

/// Flattened view of the effective configuration
#[derive(Debug, Serialize)]
pub(crate) struct ConfigSummary {
    feed: String,
    database: String,
    pool_size: u32,
    batch_size: usize,
    batch_timeout_s: f64,
    /// `None` when deduplication is disabled
    dedup_capacity: Option<usize>,
    stats_interval_s: u64,
    log_level: String,
}

impl From<&ServiceConfig> for ConfigSummary {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            feed: config.feed.endpoint(),
            database: config.database.url.clone(),
            pool_size: config.database.pool_size,
            batch_size: config.processing.batch_size,
            batch_timeout_s: config.processing.batch_timeout_s,
            dedup_capacity: config
                .processing
                .enable_deduplication
                .then_some(config.processing.dedup_capacity),
            stats_interval_s: config.processing.stats_interval_s,
            log_level: config.logging.level.clone(),
        }
    }
}

impl ConfigSummary {
    pub(crate) fn print(&self) {
        println!("  Feed: {}", self.feed);
        println!("  Database: {} (pool {})", self.database, self.pool_size);
        println!(
            "  Batching: {} records / {:.2}s",
            self.batch_size, self.batch_timeout_s
        );
        match self.dedup_capacity {
            Some(capacity) => println!("  Deduplication: window of {capacity} keys"),
            None => println!("  Deduplication: disabled"),
        }
        if self.stats_interval_s == 0 {
            println!("  Statistics: disabled");
        } else {
            println!("  Statistics: every {}s", self.stats_interval_s);
        }
        println!("  Log level: {}", self.log_level);
    }
}

/// Execute the `validate` command
pub fn run_validate(
    args: &ValidateArgs,
    explicit: Option<&Path>,
    loaded: Result<LoadedConfig, ContractError>,
) -> Result<()> {
    let result = validation_result(explicit, loaded);
    info!(config = %result.config_path, valid = result.valid, "Validated configuration");

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validation_result(
    explicit: Option<&Path>,
    loaded: Result<LoadedConfig, ContractError>,
) -> ValidationResult {
    match loaded {
        Ok(loaded) => {
            let warnings = config_loader::warnings(&loaded.config);
            ValidationResult {
                valid: true,
                config_path: describe_source(loaded.source.as_deref()),
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary::from(&loaded.config)),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path: describe_source(explicit),
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

pub(crate) fn describe_source(path: Option<&Path>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "<built-in defaults>".to_string(),
    }
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!();
            summary.print();
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
