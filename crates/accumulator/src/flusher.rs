//! Periodic timeout-flush checker

use std::sync::Arc;
use std::time::Duration;

use contracts::BatchWriter;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::accumulator::Accumulator;

/// Check for an expired batch every `interval` until cancelled
///
/// Only age-triggered flushes happen here; the final forced flush belongs to
/// [`Accumulator::shutdown`].
pub async fn run_flush_loop<W>(
    accumulator: Arc<Accumulator<W>>,
    interval: Duration,
    cancel: CancellationToken,
) where
    W: BatchWriter + Send + Sync + 'static,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Some(batch_id) = accumulator.flush_if_expired().await {
                    trace!(batch_id, "timeout flush");
                }
            }
        }
    }
    debug!("flush checker stopped");
}
