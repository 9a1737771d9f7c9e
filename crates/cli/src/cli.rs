//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// adsb-ingest - dump1090 BaseStation feed to SQLite
#[derive(Parser, Debug)]
#[command(
    name = "adsb-ingest",
    author,
    version,
    about = "ADS-B BaseStation ingestion pipeline",
    long_about = "Reads the dump1090 BaseStation (port 30003) feed, decodes every MSG line,\n\
                  drops retransmitted duplicates and writes batches of aircraft, messages\n\
                  and positions to SQLite in one transaction per batch."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "ADSB_INGEST_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format (defaults to the [logging] section of the config)
    #[arg(long, value_enum, global = true, env = "ADSB_INGEST_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,

    /// Path to configuration file (TOML or JSON); searched in the default locations when omitted
    #[arg(short, long, global = true, env = "ADSB_INGEST_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log filter from the verbosity flags, or `configured` without any
    pub fn log_level(&self, configured: &str) -> String {
        if self.quiet {
            return "warn".to_string();
        }
        match self.verbose {
            0 => configured.to_string(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the ingestion pipeline until Ctrl-C / SIGTERM
    Run(RunArgs),

    /// Validate configuration without running
    Validate(ValidateArgs),

    /// Show database health, statistics and latest positions
    Status(StatusArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Override the dump1090 host
    #[arg(long)]
    pub host: Option<String>,

    /// Override the dump1090 BaseStation port
    #[arg(long)]
    pub port: Option<u16>,

    /// Override the database url
    #[arg(long)]
    pub database_url: Option<String>,

    /// Prometheus metrics port (0 = disabled)
    #[arg(long, default_value = "0", env = "ADSB_INGEST_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `status` command
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Number of latest positions to list
    #[arg(long, default_value = "10")]
    pub limit: u32,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for contracts::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_overrides() {
        let cli = Cli::try_parse_from([
            "adsb-ingest",
            "-v",
            "--config",
            "custom.toml",
            "run",
            "--host",
            "radar.local",
            "--port",
            "30005",
            "--dry-run",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert_eq!(cli.log_level("info"), "debug");
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.host.as_deref(), Some("radar.local"));
                assert_eq!(args.port, Some(30005));
                assert!(args.dry_run);
                assert!(args.database_url.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_quiet_and_default_levels() {
        let cli = Cli::try_parse_from(["adsb-ingest", "-q", "validate"]).unwrap();
        assert_eq!(cli.log_level("info"), "warn");

        let cli = Cli::try_parse_from(["adsb-ingest", "status", "--json"]).unwrap();
        assert_eq!(cli.log_level("error"), "error");
        assert!(cli.log_format.is_none());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["adsb-ingest", "-q", "-v", "validate"]).is_err());
    }

    #[test]
    fn test_log_format_maps_to_contract() {
        let cli =
            Cli::try_parse_from(["adsb-ingest", "--log-format", "json", "validate"]).unwrap();
        let format: contracts::LogFormat = cli.log_format.unwrap().into();
        assert_eq!(format, contracts::LogFormat::Json);
    }
}
