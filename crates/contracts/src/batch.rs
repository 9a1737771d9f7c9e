//! Batch - Accumulator output
//!
//! Admitted messages handed to the writer as one unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{IcaoAddress, TelemetryMessage, TransmissionType};

/// Duplicate-suppression key: (identity, event time, transmission sub-type)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DedupKey {
    pub icao24: IcaoAddress,
    pub timestamp: NaiveDateTime,
    pub transmission_type: Option<TransmissionType>,
}

/// Flushed batch
///
/// Messages keep admission order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Batch {
    /// Sequence number (monotonically increasing per accumulator)
    pub batch_id: u64,

    /// Admitted messages in admission order
    pub messages: Vec<TelemetryMessage>,
}

/// Per-identity bounds derived from one batch
#[derive(Debug, Clone, PartialEq)]
pub struct IdentitySummary {
    pub icao24: IcaoAddress,
    /// Earliest event time in the batch
    pub first_seen: NaiveDateTime,
    /// Latest event time in the batch
    pub last_seen: NaiveDateTime,
    /// Last non-empty label in admission order
    pub callsign: Option<String>,
}

impl Batch {
    pub fn new(batch_id: u64, messages: Vec<TelemetryMessage>) -> Self {
        Self { batch_id, messages }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages carrying both coordinates
    pub fn positions(&self) -> impl Iterator<Item = &TelemetryMessage> {
        self.messages.iter().filter(|m| m.has_position())
    }

    /// One summary per distinct identity, in order of first appearance
    pub fn identities(&self) -> Vec<IdentitySummary> {
        let mut summaries: Vec<IdentitySummary> = Vec::new();

        for msg in &self.messages {
            let label = msg.callsign.as_deref().filter(|c| !c.is_empty());

            match summaries.iter_mut().find(|s| s.icao24 == msg.icao24) {
                Some(summary) => {
                    summary.first_seen = summary.first_seen.min(msg.timestamp);
                    summary.last_seen = summary.last_seen.max(msg.timestamp);
                    if let Some(label) = label {
                        summary.callsign = Some(label.to_string());
                    }
                }
                None => summaries.push(IdentitySummary {
                    icao24: msg.icao24,
                    first_seen: msg.timestamp,
                    last_seen: msg.timestamp,
                    callsign: label.map(str::to_string),
                }),
            }
        }

        summaries
    }
}
