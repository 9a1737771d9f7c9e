//! # Accumulator
//!
//! Deduplicating batch buffer between the decoder and the storage writer.
//!
//! Responsibilities:
//! - Discard records whose (icao24, timestamp, transmission type) was seen recently
//! - Group admitted records into batches, flushed by size or by age
//! - Hand detached batches, in order, to a single writer task behind a bounded queue
//! - Keep cumulative counters for reporting
//!
//! ## Usage Example
//!
//! ```ignore
//! use accumulator::{Accumulator, AccumulatorConfig, run_flush_loop};
//!
//! let acc = Arc::new(Accumulator::new(writer, AccumulatorConfig::from(&config.processing)));
//! tokio::spawn(run_flush_loop(acc.clone(), Duration::from_millis(100), cancel.clone()));
//!
//! acc.submit(message).await;
//! // ...
//! let stats = acc.shutdown().await;
//! ```

mod accumulator;
mod flusher;
mod stats;
mod window;

// Re-exports
pub use accumulator::{
    Accumulator, AccumulatorConfig, Admission, FlushReason, DEFAULT_MAX_PENDING_BATCHES,
};
pub use flusher::run_flush_loop;
pub use stats::AccumulatorStats;
pub use window::RecencyWindow;
