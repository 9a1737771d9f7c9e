//! BatchWriter trait - Accumulator output interface
//!
//! Defines the abstract interface for the transactional store.

use std::fmt;
use std::time::Duration;

use crate::{Batch, ContractError};

/// Lifecycle of one batch inside the writer
///
/// `Committed` and `RolledBack` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Pending,
    InTransaction,
    Committed,
    RolledBack,
}

impl TransactionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::RolledBack)
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InTransaction => "in_transaction",
            Self::Committed => "committed",
            Self::RolledBack => "rolled_back",
        };
        f.write_str(s)
    }
}

/// Result of a committed batch
#[derive(Debug, Clone, PartialEq)]
pub struct WriteReport {
    pub batch_id: u64,
    pub state: TransactionState,
    /// Distinct identities upserted
    pub identities: usize,
    /// Rows inserted into the message log
    pub messages: usize,
    /// Rows inserted into the position log
    pub positions: usize,
    pub elapsed: Duration,
}

/// Transactional batch store
///
/// A write is all-or-nothing: either every row of the batch is committed or
/// none is and an error is returned.
#[trait_variant::make(BatchWriter: Send)]
pub trait LocalBatchWriter {
    /// Writer name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Persist a non-empty batch in one transaction
    ///
    /// # Errors
    /// Returns the failure of the whole batch after rollback
    async fn write_batch(&self, batch: &Batch) -> Result<WriteReport, ContractError>;

    /// Cheap liveness probe, independent of batch writes
    async fn ping(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!TransactionState::Pending.is_terminal());
        assert!(!TransactionState::InTransaction.is_terminal());
        assert!(TransactionState::Committed.is_terminal());
        assert!(TransactionState::RolledBack.is_terminal());
        assert_eq!(TransactionState::RolledBack.to_string(), "rolled_back");
    }
}
