//! # Ingestion
//!
//! Feed acquisition and line decoding.
//!
//! Responsibilities:
//! - Keep one resilient connection to the BaseStation feed (`FeedSource`)
//! - Reconnect with exponential backoff, reset on success
//! - Deliver newline-terminated lines to a `LineHandler`
//! - Decode lines into `TelemetryMessage` or a rejection (`decode_line`)
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{ChannelHandler, FeedSource, SourceConfig, TcpConnector};
//! use tokio_util::sync::CancellationToken;
//!
//! let connector = TcpConnector::from_config(&config.feed);
//! let mut source = FeedSource::new(connector, SourceConfig::from(&config.feed));
//! let (mut handler, lines) = ChannelHandler::bounded(1024);
//!
//! tokio::spawn(async move { source.run(&mut handler, cancel).await });
//! while let Ok(line) = lines.recv().await {
//!     if let Ok(decoded) = ingestion::decode_line(&line) {
//!         // ...
//!     }
//! }
//! ```

mod backoff;
mod connector;
mod decoder;
mod error;
mod handler;
mod metrics;
mod source;

// Re-exports
pub use backoff::Backoff;
pub use connector::{Connector, LocalConnector, TcpConnector};
pub use decoder::{decode_line, truncate, Decoded, MSG_FIELD_COUNT};
pub use error::{DecodeError, IngestionError, Result};
pub use handler::ChannelHandler;
pub use crate::metrics::{ConnectionState, SourceMetrics, SourceSnapshot};
pub use source::{FeedSource, SourceConfig, MAX_LINE_LEN};
