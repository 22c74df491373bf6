//! Transport session: one stream connection with exact reads and writes

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, error, instrument};

use crate::common::errors::{ClientError, Result};
use crate::common::traits::Connector;
use crate::common::types::MAX_BATCH_LEN;

/// Connector that dials the lottery server over TCP
#[derive(Debug, Clone)]
pub struct TcpConnector {
    address: String,
}

impl TcpConnector {
    /// Create a connector for a `host:port` address
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self) -> io::Result<TcpStream> {
        let stream = TcpStream::connect(&self.address).await?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    fn peer(&self) -> &str {
        &self.address
    }
}

/// A connection to the server plus the negotiated batch size
///
/// The session holds at most one live stream. [`Session::reset`] is the only
/// way to swap it, and it always closes the old stream first.
pub struct Session<C: Connector> {
    connector: C,
    stream: Option<C::Stream>,
    max_bets_per_batch: usize,
}

impl<C: Connector> Session<C> {
    /// Create a disconnected session
    ///
    /// `max_bets_per_batch` must be between 1 and 255.
    pub fn new(connector: C, max_bets_per_batch: usize) -> Result<Self> {
        if max_bets_per_batch == 0 || max_bets_per_batch > MAX_BATCH_LEN {
            return Err(ClientError::InvalidBatchSize(max_bets_per_batch));
        }
        Ok(Self {
            connector,
            stream: None,
            max_bets_per_batch,
        })
    }

    pub fn max_bets_per_batch(&self) -> usize {
        self.max_bets_per_batch
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Open a connection unless one is already live
    #[instrument(skip(self), fields(peer = %self.connector.peer()))]
    pub async fn connect(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        match self.connector.connect().await {
            Ok(stream) => {
                debug!(action = "connect", result = "success");
                self.stream = Some(stream);
                Ok(())
            }
            Err(e) => {
                error!(action = "connect", result = "fail", error = %e);
                Err(ClientError::Connection(e))
            }
        }
    }

    /// Close the current connection, if any, and open a fresh one
    pub async fn reset(&mut self) -> Result<()> {
        self.close().await;
        self.connect().await
    }

    /// Shut down and drop the connection; calling it again does nothing
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            // the stream is released either way
            if let Err(e) = stream.shutdown().await {
                debug!(action = "close", result = "fail", error = %e);
            } else {
                debug!(action = "close", result = "success");
            }
        }
    }

    /// Write the whole buffer, retrying on short writes
    pub async fn write_exact(&mut self, buf: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;
        let mut written = 0;
        while written < buf.len() {
            match stream.write(&buf[written..]).await {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero).into()),
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        stream.flush().await?;
        Ok(())
    }

    /// Read exactly `n` bytes
    pub async fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.fill(&mut buf).await?;
        Ok(buf)
    }

    /// Read exactly `N` bytes into an array
    pub async fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.fill(&mut buf).await?;
        Ok(buf)
    }

    async fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;
        let mut received = 0;
        while received < buf.len() {
            match stream.read(&mut buf[received..]).await {
                Ok(0) => {
                    return Err(ClientError::PeerClosed {
                        expected: buf.len(),
                        received,
                    })
                }
                Ok(n) => received += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
