//! FeedSource - resilient line reader over one upstream connection

use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use contracts::{FeedConfig, LineHandler};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::backoff::Backoff;
use crate::connector::Connector;
use crate::decoder::truncate;
use crate::metrics::{ConnectionState, SourceMetrics};

const READ_CHUNK: usize = 8 * 1024;

/// A line longer than this without a newline is discarded
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Consecutive connect failures logged at `warn` before escalating to `error`
const WARN_FAILURES: u32 = 3;

/// Feed source tuning
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub read_timeout: Duration,
}

impl From<&FeedConfig> for SourceConfig {
    fn from(config: &FeedConfig) -> Self {
        Self {
            initial_backoff: config.reconnect_interval(),
            max_backoff: config.max_reconnect_interval(),
            read_timeout: config.read_timeout(),
        }
    }
}

enum ReadOutcome {
    Cancelled,
    Closed,
    Failed(std::io::Error),
}

/// Connects to the feed, delivers every newline-terminated line to a
/// handler and reconnects with exponential backoff until cancelled.
pub struct FeedSource<C> {
    connector: C,
    backoff: Backoff,
    read_timeout: Duration,
    consecutive_failures: u32,
    metrics: Arc<SourceMetrics>,
}

impl<C: Connector> FeedSource<C> {
    pub fn new(connector: C, config: SourceConfig) -> Self {
        Self {
            connector,
            backoff: Backoff::new(config.initial_backoff, config.max_backoff),
            read_timeout: config.read_timeout,
            consecutive_failures: 0,
            metrics: Arc::new(SourceMetrics::new()),
        }
    }

    /// Shared metrics handle (state + counters)
    pub fn metrics(&self) -> Arc<SourceMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn state(&self) -> ConnectionState {
        self.metrics.state()
    }

    /// Run until `cancel` fires
    ///
    /// Transport errors never escape: they are logged and absorbed by the
    /// reconnection loop. Cancellation is observed at every connect attempt,
    /// every read and every backoff sleep.
    #[instrument(name = "feed_source", skip_all, fields(endpoint = %self.connector.endpoint()))]
    pub async fn run<H: LineHandler>(&mut self, handler: &mut H, cancel: CancellationToken) {
        info!("feed source started");

        while !cancel.is_cancelled() {
            self.metrics.set_state(ConnectionState::Connecting);
            self.metrics.record_attempt();

            let connected = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.connector.connect() => result,
            };

            match connected {
                Ok(stream) => {
                    self.on_connected();
                    let outcome = self.read_lines(stream, handler, &cancel).await;
                    self.metrics.set_state(ConnectionState::Disconnected);
                    self.metrics.record_disconnect();
                    match outcome {
                        ReadOutcome::Cancelled => break,
                        ReadOutcome::Closed => warn!("feed closed by remote"),
                        ReadOutcome::Failed(e) => warn!(error = %e, "feed read failed"),
                    }
                }
                Err(e) => {
                    self.metrics.set_state(ConnectionState::Disconnected);
                    self.consecutive_failures += 1;
                    if self.consecutive_failures <= WARN_FAILURES {
                        warn!(error = %e, failures = self.consecutive_failures, "feed connection failed");
                    } else {
                        error!(error = %e, failures = self.consecutive_failures, "feed connection failed");
                    }
                }
            }

            let delay = self.backoff.next_delay();
            self.metrics.set_backoff(delay);
            info!(delay_s = delay.as_secs_f64(), "reconnecting after delay");

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.metrics.set_state(ConnectionState::Disconnected);
        info!("feed source stopped");
    }

    fn on_connected(&mut self) {
        if self.consecutive_failures > 0 {
            info!(
                failures = self.consecutive_failures,
                "feed connection recovered"
            );
        } else {
            info!("connected to feed");
        }
        self.consecutive_failures = 0;
        self.backoff.reset();
        self.metrics.record_connected();
        self.metrics.set_state(ConnectionState::Connected);
    }

    async fn read_lines<S, H>(
        &mut self,
        mut stream: S,
        handler: &mut H,
        cancel: &CancellationToken,
    ) -> ReadOutcome
    where
        S: AsyncRead + Unpin,
        H: LineHandler,
    {
        let mut buf = BytesMut::with_capacity(READ_CHUNK);

        let outcome = loop {
            self.metrics.set_state(ConnectionState::Reading);
            let read = tokio::select! {
                _ = cancel.cancelled() => break ReadOutcome::Cancelled,
                r = tokio::time::timeout(self.read_timeout, stream.read_buf(&mut buf)) => r,
            };
            self.metrics.set_state(ConnectionState::Connected);

            match read {
                Err(_) => {
                    trace!("feed idle");
                    continue;
                }
                Ok(Ok(0)) => break ReadOutcome::Closed,
                Ok(Ok(n)) => self.metrics.record_bytes(n),
                Ok(Err(e)) => break ReadOutcome::Failed(e),
            }

            while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                let raw = buf.split_to(pos + 1);
                let text = String::from_utf8_lossy(&raw[..pos]);
                let line = text.trim_end_matches('\r');
                if line.trim().is_empty() {
                    continue;
                }

                self.metrics.record_line();
                if let Err(e) = handler.handle_line(line.to_string()).await {
                    self.metrics.record_handler_error();
                    error!(error = %e, line = %truncate(line, 100), "line handler failed");
                }
            }

            if buf.len() > MAX_LINE_LEN {
                warn!(len = buf.len(), "discarding oversized line without terminator");
                self.metrics.record_partial_dropped();
                buf.clear();
            }
        };

        if !buf.is_empty() {
            debug!(len = buf.len(), "discarding partial line at disconnect");
            self.metrics.record_partial_dropped();
        }
        outcome
    }
}
