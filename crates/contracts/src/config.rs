//! ServiceConfig - Config Loader output
//!
//! Describes the whole service: upstream feed, database, batching and logging.
//! Every field has a default, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Upstream BaseStation feed
    #[serde(default)]
    pub feed: FeedConfig,

    /// Relational store
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Batching and deduplication
    #[serde(default)]
    pub processing: ProcessingConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Upstream feed (dump1090 BaseStation port)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_host")]
    pub host: String,

    #[serde(default = "default_feed_port")]
    pub port: u16,

    /// Initial reconnection delay (seconds)
    #[serde(default = "default_reconnect_interval")]
    pub reconnect_interval_s: u64,

    /// Reconnection delay ceiling (seconds)
    #[serde(default = "default_max_reconnect_interval")]
    pub max_reconnect_interval_s: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_s: u64,

    /// Bound on a single blocking read before it counts as idle (seconds)
    #[serde(default = "default_read_timeout")]
    pub read_timeout_s: u64,
}

fn default_feed_host() -> String {
    "localhost".to_string()
}

fn default_feed_port() -> u16 {
    30003
}

fn default_reconnect_interval() -> u64 {
    5
}

fn default_max_reconnect_interval() -> u64 {
    60
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_read_timeout() -> u64 {
    10
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            host: default_feed_host(),
            port: default_feed_port(),
            reconnect_interval_s: default_reconnect_interval(),
            max_reconnect_interval_s: default_max_reconnect_interval(),
            connect_timeout_s: default_connect_timeout(),
            read_timeout_s: default_read_timeout(),
        }
    }
}

impl FeedConfig {
    /// `host:port`
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.reconnect_interval_s)
    }

    pub fn max_reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.max_reconnect_interval_s)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_s)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_s)
    }
}

/// Relational store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection url (e.g. `sqlite://adsb.db`)
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum pooled connections
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Wait for a free pooled connection before reporting exhaustion (seconds)
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_s: u64,
}

fn default_database_url() -> String {
    "sqlite://adsb.db".to_string()
}

fn default_pool_size() -> u32 {
    5
}

fn default_acquire_timeout() -> u64 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            pool_size: default_pool_size(),
            acquire_timeout_s: default_acquire_timeout(),
        }
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_s)
    }

    /// Whether the url points at a throwaway in-memory database
    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

/// Largest accepted `batch_timeout_s`
pub const MAX_BATCH_TIMEOUT_S: f64 = 3600.0;

/// Batching, deduplication and background task cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Flush when the batch holds this many records
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Flush when the oldest unflushed record is this old (seconds)
    #[serde(default = "default_batch_timeout")]
    pub batch_timeout_s: f64,

    #[serde(default = "default_true")]
    pub enable_deduplication: bool,

    /// Recency window capacity (number of dedup keys)
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: usize,

    /// Period of the timeout-flush check (milliseconds)
    #[serde(default = "default_flush_check_interval")]
    pub flush_check_interval_ms: u64,

    /// Period of the statistics reporter (seconds, 0 = disabled)
    #[serde(default = "default_stats_interval")]
    pub stats_interval_s: u64,

    /// Capacity of the source → decoder line queue
    #[serde(default = "default_line_queue_capacity")]
    pub line_queue_capacity: usize,
}

fn default_batch_size() -> usize {
    100
}

fn default_batch_timeout() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_dedup_capacity() -> usize {
    1000
}

fn default_flush_check_interval() -> u64 {
    100
}

fn default_stats_interval() -> u64 {
    60
}

fn default_line_queue_capacity() -> usize {
    1024
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_timeout_s: default_batch_timeout(),
            enable_deduplication: true,
            dedup_capacity: default_dedup_capacity(),
            flush_check_interval_ms: default_flush_check_interval(),
            stats_interval_s: default_stats_interval(),
            line_queue_capacity: default_line_queue_capacity(),
        }
    }
}

impl ProcessingConfig {
    /// Saturates at `Duration::MAX` for values too large to represent
    pub fn batch_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.batch_timeout_s.max(0.0)).unwrap_or(Duration::MAX)
    }

    pub fn flush_check_interval(&self) -> Duration {
        Duration::from_millis(self.flush_check_interval_ms)
    }

    /// `None` when the reporter is disabled
    pub fn stats_interval(&self) -> Option<Duration> {
        (self.stats_interval_s > 0).then(|| Duration::from_secs(self.stats_interval_s))
    }
}

/// Log output settings (CLI flags take precedence)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
