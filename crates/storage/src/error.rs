//! Storage error types

use std::fmt;
use std::time::Duration;

use contracts::ContractError;
use thiserror::Error;

/// Step of a batch transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    Begin,
    UpsertIdentities,
    InsertMessages,
    InsertPositions,
    Commit,
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Begin => "begin",
            Self::UpsertIdentities => "upsert_identities",
            Self::InsertMessages => "insert_messages",
            Self::InsertPositions => "insert_positions",
            Self::Commit => "commit",
        };
        f.write_str(s)
    }
}

/// Storage-specific errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// No pooled connection became free within the acquire timeout
    #[error("connection pool exhausted after {waited:?}")]
    PoolExhausted { waited: Duration },

    /// A batch transaction failed and was rolled back
    #[error("transaction failed at {stage}: {source}")]
    Transaction {
        stage: WriteStage,
        #[source]
        source: sqlx::Error,
    },

    /// Could not open or reach the database
    #[error("database connection failed: {0}")]
    Connection(#[source] sqlx::Error),

    /// Read query failed
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),
}

impl StorageError {
    pub(crate) fn at(stage: WriteStage) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| Self::Transaction { stage, source }
    }

    /// Stage that failed, for transaction errors
    pub fn stage(&self) -> Option<WriteStage> {
        match self {
            Self::Transaction { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<StorageError> for ContractError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::PoolExhausted { waited } => ContractError::PoolExhausted {
                waited_ms: waited.as_millis() as u64,
            },
            other => ContractError::Persistence {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }
}
