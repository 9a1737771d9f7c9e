//! Writer metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for the batch writer
#[derive(Debug, Default)]
pub struct WriterMetrics {
    /// Batches committed
    committed: AtomicU64,
    /// Batches rolled back
    rolled_back: AtomicU64,
    /// Batches that never got a connection
    pool_exhausted: AtomicU64,
    identities_upserted: AtomicU64,
    messages_inserted: AtomicU64,
    positions_inserted: AtomicU64,
}

impl WriterMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_commit(&self, identities: usize, messages: usize, positions: usize) {
        self.committed.fetch_add(1, Ordering::Relaxed);
        self.identities_upserted
            .fetch_add(identities as u64, Ordering::Relaxed);
        self.messages_inserted
            .fetch_add(messages as u64, Ordering::Relaxed);
        self.positions_inserted
            .fetch_add(positions as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_rollback(&self) {
        self.rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_pool_exhausted(&self) {
        self.pool_exhausted.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> WriterSnapshot {
        WriterSnapshot {
            committed: self.committed.load(Ordering::Relaxed),
            rolled_back: self.rolled_back.load(Ordering::Relaxed),
            pool_exhausted: self.pool_exhausted.load(Ordering::Relaxed),
            identities_upserted: self.identities_upserted.load(Ordering::Relaxed),
            messages_inserted: self.messages_inserted.load(Ordering::Relaxed),
            positions_inserted: self.positions_inserted.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of writer metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterSnapshot {
    pub committed: u64,
    pub rolled_back: u64,
    pub pool_exhausted: u64,
    pub identities_upserted: u64,
    pub messages_inserted: u64,
    pub positions_inserted: u64,
}
