//! Pipeline statistics and the periodic reporter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use accumulator::{Accumulator, AccumulatorStats};
use contracts::RecordKind;
use ingestion::{DecodeError, SourceMetrics, SourceSnapshot};
use observability::WriteSummary;
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::RecordingWriter;

/// Decode outcomes seen by the consumer task
#[derive(Debug, Default)]
pub struct DecodeCounters {
    accepted: AtomicU64,
    informational: AtomicU64,
    rejected: AtomicU64,
}

impl DecodeCounters {
    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
        observability::record_decode_accepted();
    }

    pub fn record_informational(&self, kind: RecordKind) {
        self.informational.fetch_add(1, Ordering::Relaxed);
        observability::record_decode_informational(kind.as_str());
    }

    pub fn record_rejected(&self, error: &DecodeError) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
        observability::record_decode_rejected(error.reason());
    }

    pub fn snapshot(&self) -> DecodeSnapshot {
        DecodeSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            informational: self.informational.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecodeSnapshot {
    pub accepted: u64,
    pub informational: u64,
    pub rejected: u64,
}

impl DecodeSnapshot {
    pub fn total(&self) -> u64 {
        self.accepted + self.informational + self.rejected
    }
}

/// Statistics from a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub duration: Duration,
    pub source: SourceSnapshot,
    pub decode: DecodeSnapshot,
    pub accumulator: AccumulatorStats,
    pub writes: WriteSummary,
}

impl PipelineStats {
    /// Lines received per second over the whole run
    pub fn lines_per_sec(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.source.lines_received as f64 / secs
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        println!("\n=== Pipeline Statistics ===\n");

        println!("Feed");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!(
            "   ├─ Connections: {} established / {} attempts",
            self.source.connections_established, self.source.connection_attempts
        );
        println!("   ├─ Disconnects: {}", self.source.disconnects);
        println!(
            "   ├─ Lines received: {} ({:.1}/s)",
            self.source.lines_received,
            self.lines_per_sec()
        );
        println!("   └─ Handler errors: {}", self.source.handler_errors);

        println!("\nDecoder");
        println!("   ├─ Lines decoded: {}", self.decode.total());
        println!("   ├─ Accepted: {}", self.decode.accepted);
        println!("   ├─ Informational: {}", self.decode.informational);
        println!("   └─ Rejected: {}", self.decode.rejected);

        let acc = &self.accumulator;
        println!("\nAccumulator");
        println!("   ├─ Received: {}", acc.received);
        println!("   ├─ Admitted: {}", acc.admitted);
        println!(
            "   ├─ Duplicates: {} ({:.2}%)",
            acc.duplicates,
            acc.duplicate_rate()
        );
        println!("   ├─ Batches flushed: {}", acc.batches_flushed);
        println!("   ├─ Write errors: {}", acc.write_errors);
        println!("   └─ Records written: {}", acc.records_written);

        println!("\nStorage");
        for line in self.writes.to_string().lines() {
            println!("   {line}");
        }

        println!();
    }
}

/// Everything the periodic reporter reads
pub struct StatsReporter {
    pub source: Arc<SourceMetrics>,
    pub decode: Arc<DecodeCounters>,
    pub accumulator: Arc<Accumulator<RecordingWriter>>,
    pub writer: Arc<RecordingWriter>,
    pub started: Instant,
}

impl StatsReporter {
    async fn report(&self) {
        let uptime = self.started.elapsed();
        let source = self.source.snapshot();
        let decode = self.decode.snapshot();
        let acc = self.accumulator.stats();

        observability::record_pipeline_uptime(uptime);

        info!(
            uptime_s = uptime.as_secs(),
            feed = %source.state,
            lines = source.lines_received,
            decoded = decode.accepted,
            rejected = decode.rejected,
            received = acc.received,
            admitted = acc.admitted,
            duplicates = acc.duplicates,
            batches = acc.batches_flushed,
            write_errors = acc.write_errors,
            buffered = acc.buffer_depth,
            "pipeline statistics"
        );

        match self.writer.inner().database_stats().await {
            Ok(db) => info!(
                aircraft = db.total_aircraft,
                messages = db.total_messages,
                positions = db.total_positions,
                active_aircraft_1h = db.active_aircraft_1h,
                messages_1h = db.messages_1h,
                "database statistics"
            ),
            Err(e) => debug!(error = %e, "database statistics unavailable"),
        }
    }
}

/// Log statistics every `interval` until cancelled
pub async fn run_stats_reporter(
    reporter: StatsReporter,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => reporter.report().await,
        }
    }
    debug!("stats reporter stopped");
}
