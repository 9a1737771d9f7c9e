//! Ingestion error types

use std::time::Duration;

use contracts::RecordKind;
use thiserror::Error;

/// Transport-level failure of the feed source
///
/// Never leaves the source's reconnection loop; surfaced through logs and
/// [`crate::SourceMetrics`] only.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Connection refused / unreachable
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// No connection within the configured bound
    #[error("connection to {endpoint} timed out after {timeout:?}")]
    ConnectTimeout { endpoint: String, timeout: Duration },

    /// Read failed on an established connection
    #[error("read failed: {0}")]
    Read(#[from] std::io::Error),

    /// Downstream line queue is closed
    #[error("line queue closed")]
    ChannelClosed,
}

/// Why a line was rejected by the decoder
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Blank line
    #[error("empty line")]
    Empty,

    /// Fewer fields than the record kind requires
    #[error("{kind:?} record has {fields} fields")]
    TooShort { kind: RecordKind, fields: usize },

    /// First field is not a known discriminator
    #[error("unknown record kind '{0}'")]
    UnknownKind(String),

    /// Identity key is not a 24-bit hex address
    #[error("invalid icao address '{0}'")]
    InvalidIcao(String),

    /// Generated date/time pair does not parse
    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),
}

impl DecodeError {
    /// Stable label for metrics and counters
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::TooShort { .. } => "too_short",
            Self::UnknownKind(_) => "unknown_kind",
            Self::InvalidIcao(_) => "invalid_icao",
            Self::InvalidTimestamp(_) => "invalid_timestamp",
        }
    }
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_reasons_are_distinct() {
        let errors = [
            DecodeError::Empty,
            DecodeError::TooShort {
                kind: RecordKind::Msg,
                fields: 5,
            },
            DecodeError::UnknownKind("FOO".into()),
            DecodeError::InvalidIcao("XYZ".into()),
            DecodeError::InvalidTimestamp("2024/13/01".into()),
        ];
        let reasons: std::collections::HashSet<_> = errors.iter().map(|e| e.reason()).collect();
        assert_eq!(reasons.len(), errors.len());
    }

    #[test]
    fn test_display() {
        let err = DecodeError::TooShort {
            kind: RecordKind::Msg,
            fields: 10,
        };
        assert_eq!(err.to_string(), "Msg record has 10 fields");
    }
}
