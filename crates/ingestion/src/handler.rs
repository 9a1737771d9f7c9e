//! Line handlers

use async_channel::Sender;
use contracts::{ContractError, LineHandler};

/// Forwards every delivered line into a bounded queue
///
/// Applies backpressure: when the queue is full the source waits, which in
/// turn lets the TCP window fill up.
#[derive(Debug, Clone)]
pub struct ChannelHandler {
    tx: Sender<String>,
}

impl ChannelHandler {
    pub fn new(tx: Sender<String>) -> Self {
        Self { tx }
    }

    /// Create a handler and the receiving end of its queue
    pub fn bounded(capacity: usize) -> (Self, async_channel::Receiver<String>) {
        let (tx, rx) = async_channel::bounded(capacity.max(1));
        (Self::new(tx), rx)
    }
}

impl LineHandler for ChannelHandler {
    async fn handle_line(&mut self, line: String) -> Result<(), ContractError> {
        self.tx
            .send(line)
            .await
            .map_err(|_| ContractError::handler(crate::IngestionError::ChannelClosed.to_string()))
    }
}
