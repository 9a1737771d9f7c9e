//! # Observability
//!
//! Tracing subscriber and Prometheus exporter setup for the ingestion service,
//! plus the pipeline-level metric helpers.
//!
//! ## Usage
//!
//! ```ignore
//! use observability::{init_with_config, ObservabilityConfig};
//!
//! let config = ObservabilityConfig::from_logging(&service_config.logging)
//!     .with_metrics_port(Some(9100));
//! observability::init_with_config(config)?;
//!
//! observability::record_decode_accepted();
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use contracts::{LogFormat, LoggingConfig};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    record_decode_accepted, record_decode_informational, record_decode_rejected,
    record_pipeline_uptime, record_write_report, RunningStats, StatsSummary, WriteSummary,
    WriteSummaryAggregator,
};

/// Observability settings
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Prometheus port (None = disabled)
    pub metrics_port: Option<u16>,
    /// Filter used when `RUST_LOG` is not set
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            metrics_port: None,
            default_log_level: "info".to_string(),
        }
    }
}

impl ObservabilityConfig {
    /// Start from the `[logging]` section of the service configuration
    pub fn from_logging(logging: &LoggingConfig) -> Self {
        Self {
            log_format: logging.format,
            metrics_port: None,
            default_log_level: logging.level.clone(),
        }
    }

    /// Enable the Prometheus endpoint; `Some(0)` is treated as disabled
    pub fn with_metrics_port(mut self, port: Option<u16>) -> Self {
        self.metrics_port = port.filter(|p| *p != 0);
        self
    }

    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    pub fn with_default_level(mut self, level: impl Into<String>) -> Self {
        self.default_log_level = level.into();
        self
    }
}

/// Initialize tracing and, if a port is configured, the Prometheus exporter
///
/// `RUST_LOG` takes precedence over `default_log_level`.
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_log_level))
        .with_context(|| format!("Invalid log filter '{}'", config.default_log_level))?;

    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::info!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );

    Ok(())
}

/// Install only the Prometheus recorder and its HTTP listener
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port, "Prometheus metrics endpoint initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.metrics_port, None);
        assert_eq!(config.default_log_level, "info");
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_from_logging_section() {
        let logging = LoggingConfig {
            level: "debug".to_string(),
            format: LogFormat::Json,
        };
        let config = ObservabilityConfig::from_logging(&logging).with_metrics_port(Some(9100));
        assert_eq!(config.default_log_level, "debug");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.metrics_port, Some(9100));
    }

    #[test]
    fn test_zero_metrics_port_disables_exporter() {
        let config = ObservabilityConfig::default().with_metrics_port(Some(0));
        assert_eq!(config.metrics_port, None);
    }
}
