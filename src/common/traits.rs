//! Trait definitions for the seams between the client and the outside world

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// Opens byte-stream connections to the lottery server
///
/// The session asks for a fresh stream on every `connect`/`reset`, so an
/// implementation must be able to hand out any number of them.
#[async_trait]
pub trait Connector: Send + Sync {
    /// The stream type produced by this connector
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Establish a new connection
    async fn connect(&self) -> io::Result<Self::Stream>;

    /// Human readable peer description for logs
    fn peer(&self) -> &str;
}

/// Waits between protocol steps
///
/// Production code uses [`TokioSleeper`]; tests swap in sleepers that return
/// immediately and record what they were asked to do.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
