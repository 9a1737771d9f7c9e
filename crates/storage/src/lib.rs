//! # Storage
//!
//! Transactional persistence of accumulator batches.
//!
//! Responsibilities:
//! - Write each `Batch` in one all-or-nothing transaction (`SqlWriter`)
//! - Keep a bounded pool of reusable connections
//! - Report pool exhaustion distinctly from statement failures
//! - Read the aggregate and latest-position views for status reporting
//!
//! The schema in `schema/schema.sql` is a fixed external contract. It is
//! embedded as [`SCHEMA_SQL`] so test suites can provision throwaway stores;
//! the writer itself never runs DDL.

mod error;
mod metrics;
mod views;
mod writer;

pub use error::{StorageError, WriteStage};
pub use metrics::{WriterMetrics, WriterSnapshot};
pub use views::{DatabaseStats, LatestPosition};
pub use writer::{SqlWriter, REQUIRED_TABLES};

/// The persisted schema contract
pub const SCHEMA_SQL: &str = include_str!("../../../schema/schema.sql");
