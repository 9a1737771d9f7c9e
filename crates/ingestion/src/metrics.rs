//! Feed source state and counters

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::Duration;

/// Connection state machine of the feed source
///
/// `Disconnected → Connecting → Connected → (Reading ↔ Connected) → Disconnected`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    #[default]
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    /// Blocked in a socket read
    Reading = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Reading,
            _ => Self::Disconnected,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reading => "reading",
        }
    }

    /// Connected or reading
    pub fn is_up(&self) -> bool {
        matches!(self, Self::Connected | Self::Reading)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feed source metrics
///
/// Shared with the orchestrator through an `Arc`; every field is lock free.
#[derive(Debug, Default)]
pub struct SourceMetrics {
    state: AtomicU8,
    pub connection_attempts: AtomicU64,
    pub connections_established: AtomicU64,
    pub disconnects: AtomicU64,
    pub lines_received: AtomicU64,
    pub bytes_received: AtomicU64,
    pub handler_errors: AtomicU64,
    /// Line fragments discarded (oversized, or cut off by a disconnect)
    pub partial_lines_dropped: AtomicU64,
    backoff_ms: AtomicU64,
}

impl SourceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Relaxed))
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        let previous = self.state.swap(state as u8, Ordering::Relaxed);
        if previous != state as u8 {
            metrics::gauge!("adsb_ingest_feed_connected").set(if state.is_up() { 1.0 } else { 0.0 });
        }
    }

    pub(crate) fn record_attempt(&self) {
        self.connection_attempts.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("adsb_ingest_connection_attempts_total").increment(1);
    }

    pub(crate) fn record_connected(&self) {
        self.connections_established.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_bytes(&self, n: usize) {
        self.bytes_received.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_line(&self) {
        self.lines_received.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("adsb_ingest_lines_received_total").increment(1);
    }

    pub(crate) fn record_handler_error(&self) {
        self.handler_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_partial_dropped(&self) {
        self.partial_lines_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn set_backoff(&self, delay: Duration) {
        self.backoff_ms
            .store(delay.as_millis() as u64, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> SourceSnapshot {
        SourceSnapshot {
            state: self.state(),
            connection_attempts: self.connection_attempts.load(Ordering::Relaxed),
            connections_established: self.connections_established.load(Ordering::Relaxed),
            disconnects: self.disconnects.load(Ordering::Relaxed),
            lines_received: self.lines_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            handler_errors: self.handler_errors.load(Ordering::Relaxed),
            partial_lines_dropped: self.partial_lines_dropped.load(Ordering::Relaxed),
            current_backoff: Duration::from_millis(self.backoff_ms.load(Ordering::Relaxed)),
        }
    }
}

/// Point-in-time copy of [`SourceMetrics`]
#[derive(Debug, Clone, Default)]
pub struct SourceSnapshot {
    pub state: ConnectionState,
    pub connection_attempts: u64,
    pub connections_established: u64,
    pub disconnects: u64,
    pub lines_received: u64,
    pub bytes_received: u64,
    pub handler_errors: u64,
    pub partial_lines_dropped: u64,
    /// Last reconnection delay
    pub current_backoff: Duration,
}
