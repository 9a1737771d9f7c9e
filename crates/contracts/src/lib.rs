//! # Contracts
//!
//! Frozen interface contracts shared by every stage of the ingestion pipeline.
//! All business crates depend on this crate only, reverse dependencies are prohibited.
//!
//! ## Data Flow
//! - `FeedSource` delivers raw BaseStation lines to a [`LineHandler`]
//! - The decoder turns each line into a [`TelemetryMessage`]
//! - The accumulator groups admitted messages into a [`Batch`]
//! - A [`BatchWriter`] persists each batch in one transaction
//!
//! ## Time Model
//! - Event timestamps come from the feed ("date/time generated") and are naive UTC
//! - Arrival order is not monotonic in event time

mod batch;
mod config;
mod error;
mod handler;
mod icao;
mod message;
mod writer;

pub use batch::*;
pub use config::*;
pub use error::*;
pub use handler::*;
pub use icao::{IcaoAddress, InvalidIcaoAddress, ICAO_ADDRESS_LEN};
pub use message::*;
pub use writer::*;
