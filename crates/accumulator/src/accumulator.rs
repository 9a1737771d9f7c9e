//! Dedup + batch accumulator
//!
//! Admission runs under one short `std::sync::Mutex` critical section. A
//! flush detaches the whole batch with `mem::take` while holding the lock and
//! queues it for a single writer task, so writer I/O never blocks admission.
//! The batch is queued under the same lock that assigned its id: the writer
//! sees batches in detach order, one at a time.
//!
//! The queue is bounded by `max_pending_batches`. A flush that finds it full
//! waits for room, which holds back the caller of [`Accumulator::submit`] and,
//! through the bounded line queue, the feed reader.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use contracts::{Batch, BatchWriter, ProcessingConfig, TelemetryMessage};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument};

use crate::stats::{AccumulatorStats, Counters};
use crate::window::RecencyWindow;

/// Detached batches allowed to wait behind the one being written
pub const DEFAULT_MAX_PENDING_BATCHES: usize = 2;

/// Accumulator tuning
#[derive(Debug, Clone)]
pub struct AccumulatorConfig {
    /// Flush when the batch holds this many records
    pub batch_size: usize,
    /// Flush when the oldest buffered record is this old
    pub max_age: Duration,
    /// `None` disables deduplication
    pub dedup_capacity: Option<usize>,
    /// Capacity of the writer queue (at least 1)
    pub max_pending_batches: usize,
}

impl Default for AccumulatorConfig {
    fn default() -> Self {
        Self::from(&ProcessingConfig::default())
    }
}

impl From<&ProcessingConfig> for AccumulatorConfig {
    fn from(config: &ProcessingConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            max_age: config.batch_timeout(),
            dedup_capacity: config
                .enable_deduplication
                .then_some(config.dedup_capacity),
            max_pending_batches: DEFAULT_MAX_PENDING_BATCHES,
        }
    }
}

/// Outcome of [`Accumulator::submit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Duplicate,
}

/// What triggered a flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    Size,
    Timeout,
    Forced,
}

impl FlushReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::Timeout => "timeout",
            Self::Forced => "forced",
        }
    }
}

struct State {
    batch: Vec<TelemetryMessage>,
    /// Admission time of the first record in `batch`
    oldest: Option<Instant>,
    window: Option<RecencyWindow>,
    next_batch_id: u64,
}

impl State {
    fn is_expired(&self, max_age: Duration) -> bool {
        self.oldest.is_some_and(|t| t.elapsed() >= max_age)
    }

    fn flush_due(&self, reason: FlushReason, config: &AccumulatorConfig) -> bool {
        match reason {
            FlushReason::Size => self.batch.len() >= config.batch_size,
            FlushReason::Timeout => self.is_expired(config.max_age),
            FlushReason::Forced => !self.batch.is_empty(),
        }
    }

    fn detach(&mut self, capacity: usize) -> Option<Batch> {
        if self.batch.is_empty() {
            return None;
        }
        let messages = std::mem::replace(&mut self.batch, Vec::with_capacity(capacity));
        self.oldest = None;
        self.next_batch_id += 1;
        Some(Batch::new(self.next_batch_id, messages))
    }
}

struct PendingWrite {
    batch: Batch,
    reason: FlushReason,
}

/// Batches queued for, or being written by, the writer task
#[derive(Default)]
struct Backlog {
    outstanding: AtomicUsize,
    drained: Notify,
}

impl Backlog {
    fn queued(&self) {
        let outstanding = self.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::gauge!("adsb_ingest_pending_batches").set(outstanding as f64);
    }

    fn completed(&self) {
        let outstanding = self.outstanding.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::gauge!("adsb_ingest_pending_batches").set(outstanding as f64);
        if outstanding == 0 {
            self.drained.notify_waiters();
        }
    }

    fn len(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    async fn wait_drained(&self) {
        loop {
            // Registered before the check, so a completion in between still wakes it
            let drained = self.drained.notified();
            if self.len() == 0 {
                return;
            }
            drained.await;
        }
    }
}

/// Deduplicating batch buffer in front of a [`BatchWriter`]
pub struct Accumulator<W> {
    config: AccumulatorConfig,
    state: Mutex<State>,
    counters: Arc<Counters>,
    writer: Arc<W>,
    backlog: Arc<Backlog>,
    /// Taken by `shutdown` to close the queue
    queue: Mutex<Option<mpsc::Sender<PendingWrite>>>,
    writer_task: Mutex<Option<JoinHandle<()>>>,
}

impl<W> Accumulator<W>
where
    W: BatchWriter + Send + Sync + 'static,
{
    /// Create the accumulator and spawn its writer task
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(writer: Arc<W>, config: AccumulatorConfig) -> Self {
        let window = config.dedup_capacity.map(RecencyWindow::new);
        let counters = Arc::new(Counters::default());
        let backlog = Arc::new(Backlog::default());
        let (queue, pending) = mpsc::channel(config.max_pending_batches.max(1));

        let writer_task = tokio::spawn(drain_queue(
            Arc::clone(&writer),
            pending,
            Arc::clone(&counters),
            Arc::clone(&backlog),
        ));

        Self {
            state: Mutex::new(State {
                batch: Vec::with_capacity(config.batch_size),
                oldest: None,
                window,
                next_batch_id: 0,
            }),
            counters,
            writer,
            backlog,
            queue: Mutex::new(Some(queue)),
            writer_task: Mutex::new(Some(writer_task)),
            config,
        }
    }

    pub fn config(&self) -> &AccumulatorConfig {
        &self.config
    }

    pub fn writer(&self) -> &Arc<W> {
        &self.writer
    }

    /// Admit or discard one record
    ///
    /// Triggers a flush when the batch reaches `batch_size` or its oldest
    /// record has outlived `max_age`, whichever happens first. Waits while
    /// the writer queue is full; if that wait is cancelled the record stays
    /// buffered for the next flush.
    pub async fn submit(&self, msg: TelemetryMessage) -> Admission {
        self.counters.received.fetch_add(1, Ordering::Relaxed);

        let due = {
            let mut state = lock(&self.state);

            if let Some(window) = state.window.as_mut() {
                if !window.insert(msg.dedup_key()) {
                    drop(state);
                    self.counters.duplicates.fetch_add(1, Ordering::Relaxed);
                    metrics::counter!("adsb_ingest_admissions_total", "outcome" => "duplicate")
                        .increment(1);
                    return Admission::Duplicate;
                }
            }

            if state.batch.is_empty() {
                state.oldest = Some(Instant::now());
            }
            state.batch.push(msg);
            self.counters.admitted.fetch_add(1, Ordering::Relaxed);
            self.set_depth(state.batch.len());

            if state.flush_due(FlushReason::Size, &self.config) {
                Some(FlushReason::Size)
            } else if state.flush_due(FlushReason::Timeout, &self.config) {
                Some(FlushReason::Timeout)
            } else {
                None
            }
        };

        metrics::counter!("adsb_ingest_admissions_total", "outcome" => "admitted").increment(1);
        if let Some(reason) = due {
            self.flush(reason).await;
        }
        Admission::Admitted
    }

    /// Flush if the oldest buffered record has outlived `max_age`
    ///
    /// Returns the id of the detached batch, if any.
    pub async fn flush_if_expired(&self) -> Option<u64> {
        self.flush(FlushReason::Timeout).await
    }

    /// Flush whatever is buffered, regardless of size or age
    pub async fn force_flush(&self) -> Option<u64> {
        self.flush(FlushReason::Forced).await
    }

    /// Wait until every batch handed to the writer so far has finished
    pub async fn wait_idle(&self) {
        self.backlog.wait_drained().await;
    }

    /// Final flush, then wait for the writer to finish every queued batch
    #[instrument(name = "accumulator_shutdown", skip(self))]
    pub async fn shutdown(&self) -> AccumulatorStats {
        if let Some(batch_id) = self.force_flush().await {
            debug!(batch_id, "final batch detached");
        }

        // Dropping the sender ends the writer task once the queue is empty
        drop(lock(&self.queue).take());
        let writer_task = lock(&self.writer_task).take();
        if let Some(task) = writer_task {
            if let Err(e) = task.await {
                error!(error = %e, "batch writer task failed");
            }
        }

        let stats = self.stats();
        info!(
            admitted = stats.admitted,
            duplicates = stats.duplicates,
            batches = stats.batches_flushed,
            write_errors = stats.write_errors,
            "accumulator drained"
        );
        stats
    }

    pub fn stats(&self) -> AccumulatorStats {
        self.counters.snapshot()
    }

    /// Batches detached but not yet finished
    pub fn in_flight(&self) -> usize {
        self.backlog.len()
    }

    fn set_depth(&self, depth: usize) {
        self.counters.buffer_depth.store(depth, Ordering::Relaxed);
        metrics::gauge!("adsb_ingest_buffer_depth").set(depth as f64);
    }

    async fn flush(&self, reason: FlushReason) -> Option<u64> {
        let due = lock(&self.state).flush_due(reason, &self.config);
        if !due {
            return None;
        }

        let queue = lock(&self.queue).as_ref().cloned()?;
        let slot = match queue.try_reserve() {
            Ok(slot) => slot,
            Err(TrySendError::Full(())) => {
                metrics::counter!("adsb_ingest_flush_waits_total").increment(1);
                debug!(reason = reason.as_str(), "writer queue full, waiting");
                queue.reserve().await.ok()?
            }
            Err(TrySendError::Closed(())) => return None,
        };

        let mut state = lock(&self.state);
        // Another flush may have taken the batch while this one waited
        if !state.flush_due(reason, &self.config) {
            return None;
        }
        let batch = state.detach(self.config.batch_size)?;
        self.set_depth(state.batch.len());

        let batch_id = batch.batch_id;
        debug!(batch_id, size = batch.len(), reason = reason.as_str(), "batch detached");
        self.backlog.queued();
        slot.send(PendingWrite { batch, reason });
        Some(batch_id)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Every guarded mutation is a single push, swap or take, so a poisoned value is still consistent
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Write queued batches one at a time until every sender is gone
async fn drain_queue<W: BatchWriter>(
    writer: Arc<W>,
    mut pending: mpsc::Receiver<PendingWrite>,
    counters: Arc<Counters>,
    backlog: Arc<Backlog>,
) {
    while let Some(PendingWrite { batch, reason }) = pending.recv().await {
        write_batch(writer.as_ref(), &counters, &batch, reason).await;
        backlog.completed();
    }
    debug!("batch writer stopped");
}

#[instrument(
    name = "accumulator_write_batch",
    skip_all,
    fields(writer = writer.name(), batch_id = batch.batch_id, size = batch.len())
)]
async fn write_batch<W: BatchWriter>(
    writer: &W,
    counters: &Counters,
    batch: &Batch,
    reason: FlushReason,
) {
    let started = Instant::now();
    match writer.write_batch(batch).await {
        Ok(report) => {
            counters.batches_flushed.fetch_add(1, Ordering::Relaxed);
            counters
                .records_written
                .fetch_add(report.messages as u64, Ordering::Relaxed);
            metrics::counter!("adsb_ingest_batches_flushed_total", "reason" => reason.as_str())
                .increment(1);
            metrics::histogram!("adsb_ingest_batch_size").record(batch.len() as f64);
            metrics::histogram!("adsb_ingest_write_latency_ms")
                .record(started.elapsed().as_secs_f64() * 1000.0);
            debug!(
                identities = report.identities,
                positions = report.positions,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "batch committed"
            );
        }
        Err(e) => {
            counters.write_errors.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("adsb_ingest_write_errors_total").increment(1);
            error!(
                error = %e,
                pool_exhausted = e.is_pool_exhausted(),
                "batch write failed, batch discarded"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use contracts::{ContractError, IcaoAddress, TransactionState, TransmissionType, WriteReport};
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use tokio::sync::Semaphore;

    /// Records batches, optionally slow or failing
    #[derive(Default)]
    struct MockWriter {
        batches: Mutex<Vec<Batch>>,
        fail: AtomicBool,
        delay: Option<Duration>,
        /// Each write waits for one permit
        gate: Option<Arc<Semaphore>>,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl MockWriter {
        fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Default::default()
            }
        }

        fn gated(gate: Arc<Semaphore>) -> Self {
            Self {
                gate: Some(gate),
                ..Default::default()
            }
        }

        fn batches(&self) -> Vec<Batch> {
            self.batches.lock().unwrap().clone()
        }
    }

    impl BatchWriter for MockWriter {
        fn name(&self) -> &str {
            "mock"
        }

        async fn write_batch(&self, batch: &Batch) -> Result<WriteReport, ContractError> {
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(active, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            self.active.fetch_sub(1, Ordering::SeqCst);

            if self.fail.load(Ordering::SeqCst) {
                return Err(ContractError::persistence("forced failure"));
            }
            self.batches.lock().unwrap().push(batch.clone());
            Ok(WriteReport {
                batch_id: batch.batch_id,
                state: TransactionState::Committed,
                identities: batch.identities().len(),
                messages: batch.len(),
                positions: batch.positions().count(),
                elapsed: Duration::ZERO,
            })
        }

        async fn ping(&self) -> bool {
            true
        }
    }

    fn msg(icao: &str, second: i64) -> TelemetryMessage {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let mut msg = TelemetryMessage::new(
            IcaoAddress::parse(icao).unwrap(),
            base + chrono::Duration::seconds(second),
        );
        msg.transmission_type = Some(TransmissionType::AirbornePosition);
        msg
    }

    fn config(batch_size: usize, max_age_ms: u64, dedup: Option<usize>) -> AccumulatorConfig {
        AccumulatorConfig {
            batch_size,
            max_age: Duration::from_millis(max_age_ms),
            dedup_capacity: dedup,
            max_pending_batches: DEFAULT_MAX_PENDING_BATCHES,
        }
    }

    #[tokio::test]
    async fn test_consecutive_duplicate_discarded() {
        let writer = Arc::new(MockWriter::default());
        let acc = Accumulator::new(writer.clone(), config(10, 1000, Some(100)));

        assert_eq!(acc.submit(msg("4CA123", 0)).await, Admission::Admitted);
        assert_eq!(acc.submit(msg("4CA123", 0)).await, Admission::Duplicate);

        let stats = acc.stats();
        assert_eq!(stats.received, 2);
        assert_eq!(stats.admitted, 1);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.buffer_depth, 1);
    }

    #[tokio::test]
    async fn test_window_capacity_bounds_dedup() {
        let writer = Arc::new(MockWriter::default());
        let acc = Accumulator::new(writer.clone(), config(100, 10_000, Some(2)));

        acc.submit(msg("AAAAAA", 0)).await;
        acc.submit(msg("BBBBBB", 0)).await;
        acc.submit(msg("CCCCCC", 0)).await;
        // AAAAAA left the window: admitted again
        assert_eq!(acc.submit(msg("AAAAAA", 0)).await, Admission::Admitted);
        assert_eq!(acc.stats().admitted, 4);
    }

    #[tokio::test]
    async fn test_dedup_disabled() {
        let writer = Arc::new(MockWriter::default());
        let acc = Accumulator::new(writer.clone(), config(100, 10_000, None));

        assert_eq!(acc.submit(msg("4CA123", 0)).await, Admission::Admitted);
        assert_eq!(acc.submit(msg("4CA123", 0)).await, Admission::Admitted);
        assert_eq!(acc.stats().duplicates, 0);
    }

    #[tokio::test]
    async fn test_flush_exactly_at_batch_size() {
        let writer = Arc::new(MockWriter::default());
        let acc = Accumulator::new(writer.clone(), config(3, 60_000, Some(100)));

        acc.submit(msg("4CA123", 0)).await;
        acc.submit(msg("4CA123", 1)).await;
        acc.wait_idle().await;
        assert!(writer.batches().is_empty(), "flushed at N-1");
        assert_eq!(acc.stats().buffer_depth, 2);

        acc.submit(msg("4CA123", 2)).await;
        acc.wait_idle().await;

        let batches = writer.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].batch_id, 1);
        // admission order preserved
        let seconds: Vec<_> = batches[0]
            .messages
            .iter()
            .map(|m| m.timestamp.and_utc().timestamp() % 60)
            .collect();
        assert_eq!(seconds, vec![0, 1, 2]);

        let stats = acc.stats();
        assert_eq!(stats.batches_flushed, 1);
        assert_eq!(stats.records_written, 3);
        assert_eq!(stats.buffer_depth, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_flush_without_new_arrivals() {
        let writer = Arc::new(MockWriter::default());
        let acc = Arc::new(Accumulator::new(writer.clone(), config(100, 1000, Some(100))));
        let cancel = tokio_util::sync::CancellationToken::new();
        let flusher = tokio::spawn(crate::run_flush_loop(
            acc.clone(),
            Duration::from_millis(100),
            cancel.clone(),
        ));

        acc.submit(msg("4CA123", 0)).await;
        acc.submit(msg("3C6DD2", 0)).await;

        tokio::time::sleep(Duration::from_millis(500)).await;
        acc.wait_idle().await;
        assert!(writer.batches().is_empty());

        tokio::time::sleep(Duration::from_millis(700)).await;
        acc.wait_idle().await;
        let batches = writer.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);

        cancel.cancel();
        flusher.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_batch_flushes_on_next_submit() {
        let writer = Arc::new(MockWriter::default());
        let acc = Accumulator::new(writer.clone(), config(100, 1000, Some(100)));

        acc.submit(msg("4CA123", 0)).await;
        tokio::time::advance(Duration::from_millis(1500)).await;
        acc.submit(msg("4CA123", 1)).await;
        acc.wait_idle().await;

        assert_eq!(writer.batches()[0].len(), 2);
    }

    #[tokio::test]
    async fn test_write_failure_is_counted_not_retried() {
        let writer = Arc::new(MockWriter::default());
        writer.fail.store(true, Ordering::SeqCst);
        let acc = Accumulator::new(writer.clone(), config(2, 60_000, Some(100)));

        acc.submit(msg("4CA123", 0)).await;
        acc.submit(msg("4CA123", 1)).await;
        acc.wait_idle().await;

        let stats = acc.stats();
        assert_eq!(stats.write_errors, 1);
        assert_eq!(stats.batches_flushed, 0);
        assert_eq!(stats.buffer_depth, 0);

        // the failed batch is gone; the next flush only carries new records
        writer.fail.store(false, Ordering::SeqCst);
        acc.submit(msg("4CA123", 2)).await;
        acc.force_flush().await;
        acc.wait_idle().await;
        assert_eq!(writer.batches()[0].len(), 1);
    }

    #[tokio::test]
    async fn test_force_flush_empty_is_noop() {
        let writer = Arc::new(MockWriter::default());
        let acc = Accumulator::new(writer.clone(), config(10, 1000, Some(100)));
        assert!(acc.force_flush().await.is_none());
        assert!(acc.flush_if_expired().await.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_flushes_remainder() {
        let writer = Arc::new(MockWriter::slow(Duration::from_millis(20)));
        let acc = Accumulator::new(writer.clone(), config(2, 60_000, Some(100)));

        for second in 0..5 {
            acc.submit(msg("4CA123", second)).await;
        }
        let stats = acc.shutdown().await;

        assert_eq!(stats.batches_flushed, 3);
        assert_eq!(stats.records_written, 5);
        assert_eq!(acc.in_flight(), 0);
        let ids: Vec<_> = writer.batches().iter().map(|b| b.batch_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_batches_reach_writer_in_detach_order() {
        let writer = Arc::new(MockWriter::default());
        let acc = Arc::new(Accumulator::new(writer, config(1, 60_000, None)));

        // Every submit detaches a batch from inside one worker task
        let submitter = tokio::spawn({
            let acc = acc.clone();
            async move {
                for second in 0..20 {
                    acc.submit(msg("4CA123", second)).await;
                }
            }
        });
        submitter.await.unwrap();
        acc.shutdown().await;

        let batches = acc.writer().batches();
        let ids: Vec<u64> = batches.iter().map(|b| b.batch_id).collect();
        assert_eq!(ids, (1..=20).collect::<Vec<u64>>());
        let seconds: Vec<i64> = batches
            .iter()
            .map(|b| b.messages[0].timestamp.and_utc().timestamp() % 60)
            .collect();
        assert_eq!(seconds, (0..20).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn test_full_writer_queue_holds_back_submit() {
        let gate = Arc::new(Semaphore::new(0));
        let writer = Arc::new(MockWriter::gated(gate.clone()));
        let mut cfg = config(1, 60_000, Some(100));
        cfg.max_pending_batches = 1;
        let acc = Accumulator::new(writer.clone(), cfg);

        // batch 1 reaches the writer and stalls there
        acc.submit(msg("4CA123", 0)).await;
        while writer.active.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        // batch 2 takes the only queue slot
        acc.submit(msg("4CA123", 1)).await;
        assert_eq!(acc.in_flight(), 2);

        // batch 3 has no room and waits
        let waited =
            tokio::time::timeout(Duration::from_millis(50), acc.submit(msg("4CA123", 2))).await;
        assert!(waited.is_err(), "submit returned while the queue was full");

        // the record is admitted and stays buffered; the backlog does not grow
        let stats = acc.stats();
        assert_eq!(stats.admitted, 3);
        assert_eq!(stats.buffer_depth, 1);
        assert_eq!(acc.in_flight(), 2);

        gate.add_permits(3);
        let stats = acc.shutdown().await;
        assert_eq!(stats.batches_flushed, 3);
        assert_eq!(stats.buffer_depth, 0);
        let ids: Vec<_> = writer.batches().iter().map(|b| b.batch_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_submit_and_flush_lose_nothing() {
        let writer = Arc::new(MockWriter::slow(Duration::from_millis(1)));
        let acc = Arc::new(Accumulator::new(writer.clone(), config(7, 60_000, Some(10_000))));

        let mut handles = Vec::new();
        for task in 0..4 {
            let acc = acc.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..250 {
                    acc.submit(msg("4CA123", task * 1000 + i)).await;
                    if i % 50 == 0 {
                        acc.force_flush().await;
                        tokio::task::yield_now().await;
                    }
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        acc.shutdown().await;

        let batches = writer.batches();
        let written: usize = batches.iter().map(Batch::len).sum();
        assert_eq!(written, 1000);

        // ids are unique and arrive in detach order
        let ids: Vec<_> = batches.iter().map(|b| b.batch_id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]), "out of order: {ids:?}");

        // single writer task: never more than one write in flight
        assert_eq!(writer.max_active.load(Ordering::SeqCst), 1);
    }
}
