//! Connector - how the feed source obtains a byte stream

use std::time::Duration;

use tokio::io::AsyncRead;
use tokio::net::TcpStream;
use tracing::{debug, instrument, warn};

use crate::error::{IngestionError, Result};

/// Opens one connection to the upstream producer
#[trait_variant::make(Connector: Send)]
pub trait LocalConnector {
    type Stream: AsyncRead + Unpin + Send;

    /// Human-readable endpoint (used for logging)
    fn endpoint(&self) -> &str;

    /// Establish a fresh connection
    async fn connect(&self) -> Result<Self::Stream>;
}

/// Plain TCP connector (dump1090 BaseStation output)
#[derive(Debug, Clone)]
pub struct TcpConnector {
    endpoint: String,
    connect_timeout: Duration,
}

impl TcpConnector {
    pub fn new(endpoint: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout,
        }
    }

    pub fn from_config(config: &contracts::FeedConfig) -> Self {
        Self::new(config.endpoint(), config.connect_timeout())
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[instrument(name = "feed_connect", skip(self), fields(endpoint = %self.endpoint))]
    async fn connect(&self) -> Result<TcpStream> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.endpoint))
            .await
            .map_err(|_| IngestionError::ConnectTimeout {
                endpoint: self.endpoint.clone(),
                timeout: self.connect_timeout,
            })?
            .map_err(|source| IngestionError::Connect {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        if let Err(e) = stream.set_nodelay(true) {
            warn!(error = %e, "failed to set TCP_NODELAY");
        }
        debug!("tcp connection established");
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_connect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"CLK,,1\n").await.unwrap();
        });

        let connector = TcpConnector::new(addr.to_string(), Duration::from_secs(1));
        let mut stream = Connector::connect(&connector).await.unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"CLK,,1\n");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_tcp_connect_refused() {
        // Bind then drop to get a port nobody listens on
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let connector = TcpConnector::new(addr.to_string(), Duration::from_secs(1));
        let err = Connector::connect(&connector).await.unwrap_err();
        assert!(matches!(err, IngestionError::Connect { .. }));
        assert!(err.to_string().contains(&addr.to_string()));
    }
}
