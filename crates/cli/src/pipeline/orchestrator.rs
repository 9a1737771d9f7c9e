//! Pipeline orchestrator - wires source, decoder, accumulator and writer.
//!
//! Task layout while running:
//! - source task: `FeedSource` pushing raw lines into a bounded queue
//! - consumer task: decodes each line and submits it to the accumulator
//! - flush checker: age-triggered flushes when no lines arrive
//! - stats reporter (optional)
//!
//! Shutdown order: cancel, source ends and drops the queue sender, consumer
//! drains what is left, accumulator force-flushes and waits for writes.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use accumulator::{run_flush_loop, Accumulator, AccumulatorConfig};
use anyhow::{Context, Result};
use async_channel::Receiver;
use contracts::{BatchWriter, ServiceConfig};
use ingestion::{decode_line, truncate, ChannelHandler, Decoded, FeedSource, SourceConfig, TcpConnector};
use storage::SqlWriter;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::stats::{run_stats_reporter, DecodeCounters, StatsReporter};
use super::{PipelineStats, RecordingWriter};

/// Longest line prefix included in rejection logs
const REJECTED_LINE_PREVIEW: usize = 100;

/// Main pipeline orchestrator
pub struct Pipeline {
    config: ServiceConfig,
}

impl Pipeline {
    pub fn new(config: ServiceConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves, then drain and return the final statistics
    pub async fn run<S>(self, shutdown: S) -> Result<PipelineStats>
    where
        S: Future<Output = ()>,
    {
        let started = Instant::now();
        let config = &self.config;

        info!(
            feed = %config.feed.endpoint(),
            database = %config.database.url,
            batch_size = config.processing.batch_size,
            batch_timeout_s = config.processing.batch_timeout_s,
            dedup = config.processing.enable_deduplication,
            "Starting pipeline"
        );

        let sql = SqlWriter::connect(&config.database)
            .await
            .with_context(|| format!("Failed to connect to database {}", config.database.url))?;
        let writer = Arc::new(RecordingWriter::new(sql));
        if !writer.ping().await {
            warn!("Database liveness probe failed, batches may be lost until it recovers");
        }

        let accumulator = Arc::new(Accumulator::new(
            Arc::clone(&writer),
            AccumulatorConfig::from(&config.processing),
        ));

        let cancel = CancellationToken::new();
        let (mut handler, lines) = ChannelHandler::bounded(config.processing.line_queue_capacity);
        let mut source = FeedSource::new(
            TcpConnector::from_config(&config.feed),
            SourceConfig::from(&config.feed),
        );
        let source_metrics = source.metrics();
        let decode = Arc::new(DecodeCounters::default());

        let source_task = tokio::spawn({
            let cancel = cancel.clone();
            async move { source.run(&mut handler, cancel).await }
        });
        let consumer_task = tokio::spawn(consume_lines(
            lines,
            Arc::clone(&accumulator),
            Arc::clone(&decode),
        ));
        let flush_task = tokio::spawn(run_flush_loop(
            Arc::clone(&accumulator),
            config.processing.flush_check_interval(),
            cancel.clone(),
        ));
        let reporter_task = config.processing.stats_interval().map(|interval| {
            let reporter = StatsReporter {
                source: Arc::clone(&source_metrics),
                decode: Arc::clone(&decode),
                accumulator: Arc::clone(&accumulator),
                writer: Arc::clone(&writer),
                started,
            };
            tokio::spawn(run_stats_reporter(reporter, interval, cancel.clone()))
        });

        info!("Pipeline running");
        shutdown.await;

        info!("Shutting down pipeline...");
        cancel.cancel();

        join_task("source", source_task).await;
        join_task("consumer", consumer_task).await;
        join_task("flush checker", flush_task).await;
        if let Some(task) = reporter_task {
            join_task("stats reporter", task).await;
        }

        let accumulator_stats = accumulator.shutdown().await;
        writer.inner().close().await;

        let stats = PipelineStats {
            duration: started.elapsed(),
            source: source_metrics.snapshot(),
            decode: decode.snapshot(),
            accumulator: accumulator_stats,
            writes: writer.summary(),
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            lines = stats.source.lines_received,
            written = stats.accumulator.records_written,
            write_errors = stats.accumulator.write_errors,
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

/// Decode queued lines and submit transmissions until the queue closes
///
/// The queue closes once the source task has ended and every buffered line
/// has been received, so this also performs the shutdown drain.
async fn consume_lines<W>(
    lines: Receiver<String>,
    accumulator: Arc<Accumulator<W>>,
    decode: Arc<DecodeCounters>,
) where
    W: BatchWriter + Send + Sync + 'static,
{
    while let Ok(line) = lines.recv().await {
        match decode_line(&line) {
            Ok(Decoded::Transmission(msg)) => {
                decode.record_accepted();
                accumulator.submit(msg).await;
            }
            Ok(Decoded::Informational(kind)) => {
                decode.record_informational(kind);
                trace!(kind = kind.as_str(), "informational line ignored");
            }
            Err(e) => {
                decode.record_rejected(&e);
                debug!(
                    reason = e.reason(),
                    error = %e,
                    line = %truncate(&line, REJECTED_LINE_PREVIEW),
                    "line rejected"
                );
            }
        }
    }
    debug!("line queue closed, consumer stopped");
}

async fn join_task(name: &str, task: JoinHandle<()>) {
    if let Err(e) = task.await {
        warn!(task = name, error = %e, "pipeline task ended abnormally");
    }
}
