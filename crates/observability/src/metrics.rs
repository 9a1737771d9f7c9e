//! Pipeline metrics
//!
//! Stage-local counters (connection state, admissions, flushes) are recorded
//! by the crates that own them. This module covers what the orchestrator
//! sees: decode outcomes, committed write reports and process uptime, plus
//! in-memory aggregation for the end-of-run summary.

use std::fmt;
use std::time::Duration;

use contracts::WriteReport;
use metrics::{counter, gauge, histogram};

/// A line decoded into a transmission record
pub fn record_decode_accepted() {
    counter!("adsb_ingest_decoded_total", "outcome" => "accepted").increment(1);
}

/// A recognised informational line (SEL, ID, AIR, STA, CLK)
pub fn record_decode_informational(kind: &'static str) {
    counter!("adsb_ingest_decoded_total", "outcome" => "informational").increment(1);
    counter!("adsb_ingest_informational_total", "kind" => kind).increment(1);
}

/// A rejected line, labelled by rejection reason
pub fn record_decode_rejected(reason: &'static str) {
    counter!("adsb_ingest_decoded_total", "outcome" => "rejected").increment(1);
    counter!("adsb_ingest_decode_rejections_total", "reason" => reason).increment(1);
}

/// Rows committed by one batch, per table
pub fn record_write_report(report: &WriteReport) {
    counter!("adsb_ingest_rows_written_total", "table" => "aircraft")
        .increment(report.identities as u64);
    counter!("adsb_ingest_rows_written_total", "table" => "messages")
        .increment(report.messages as u64);
    counter!("adsb_ingest_rows_written_total", "table" => "positions")
        .increment(report.positions as u64);
    histogram!("adsb_ingest_transaction_ms").record(report.elapsed.as_secs_f64() * 1000.0);
}

pub fn record_pipeline_uptime(uptime: Duration) {
    gauge!("adsb_ingest_uptime_seconds").set(uptime.as_secs_f64());
}

/// Aggregates committed write reports in memory
#[derive(Debug, Clone, Default)]
pub struct WriteSummaryAggregator {
    batches: u64,
    identities: u64,
    messages: u64,
    positions: u64,
    batch_size: RunningStats,
    latency_ms: RunningStats,
}

impl WriteSummaryAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, report: &WriteReport) {
        self.batches += 1;
        self.identities += report.identities as u64;
        self.messages += report.messages as u64;
        self.positions += report.positions as u64;
        self.batch_size.push(report.messages as f64);
        self.latency_ms.push(report.elapsed.as_secs_f64() * 1000.0);
    }

    pub fn summary(&self) -> WriteSummary {
        WriteSummary {
            batches: self.batches,
            identities: self.identities,
            messages: self.messages,
            positions: self.positions,
            position_ratio: if self.messages > 0 {
                self.positions as f64 / self.messages as f64 * 100.0
            } else {
                0.0
            },
            batch_size: StatsSummary::from(&self.batch_size),
            latency_ms: StatsSummary::from(&self.latency_ms),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Summary of committed writes
#[derive(Debug, Clone, Default)]
pub struct WriteSummary {
    pub batches: u64,
    /// Identity upserts (one per distinct key per batch)
    pub identities: u64,
    pub messages: u64,
    pub positions: u64,
    /// Share of messages that carried a position, in percent
    pub position_ratio: f64,
    pub batch_size: StatsSummary,
    pub latency_ms: StatsSummary,
}

impl fmt::Display for WriteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Committed batches: {}", self.batches)?;
        writeln!(f, "Identity upserts: {}", self.identities)?;
        writeln!(f, "Messages written: {}", self.messages)?;
        writeln!(
            f,
            "Positions written: {} ({:.2}%)",
            self.positions, self.position_ratio
        )?;
        writeln!(f, "Batch size: {}", self.batch_size)?;
        write!(f, "Transaction time (ms): {}", self.latency_ms)
    }
}

/// Summary of a [`RunningStats`]
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online mean/variance (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
