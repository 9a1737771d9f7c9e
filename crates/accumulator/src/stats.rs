//! Accumulator counters

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::Serialize;

/// Cumulative counters, never reset
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub received: AtomicU64,
    pub admitted: AtomicU64,
    pub duplicates: AtomicU64,
    pub batches_flushed: AtomicU64,
    pub write_errors: AtomicU64,
    pub records_written: AtomicU64,
    pub buffer_depth: AtomicUsize,
}

impl Counters {
    pub fn snapshot(&self) -> AccumulatorStats {
        AccumulatorStats {
            received: self.received.load(Ordering::Relaxed),
            admitted: self.admitted.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            batches_flushed: self.batches_flushed.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
            buffer_depth: self.buffer_depth.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the accumulator counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AccumulatorStats {
    /// Records submitted
    pub received: u64,
    /// Records accepted into a batch
    pub admitted: u64,
    /// Records discarded by the recency window
    pub duplicates: u64,
    /// Batches committed by the writer
    pub batches_flushed: u64,
    /// Batches the writer failed (discarded, not retried)
    pub write_errors: u64,
    /// Message rows acknowledged by the writer
    pub records_written: u64,
    /// Records waiting in the current batch
    pub buffer_depth: usize,
}

impl AccumulatorStats {
    /// Share of received records that were duplicates, in percent
    pub fn duplicate_rate(&self) -> f64 {
        if self.received == 0 {
            0.0
        } else {
            self.duplicates as f64 / self.received as f64 * 100.0
        }
    }
}

impl fmt::Display for AccumulatorStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "received={} admitted={} duplicates={} ({:.1}%) batches={} write_errors={} written={} buffered={}",
            self.received,
            self.admitted,
            self.duplicates,
            self.duplicate_rate(),
            self.batches_flushed,
            self.write_errors,
            self.records_written,
            self.buffer_depth
        )
    }
}
