//! In-crate test doubles for the connector and sleeper seams

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::common::traits::{Connector, Sleeper};
use crate::common::types::StopFlag;

/// Hands out pre-built streams in order, then refuses connections
pub struct ScriptedConnector<S> {
    streams: Mutex<VecDeque<S>>,
    connects: AtomicUsize,
}

impl<S> ScriptedConnector<S> {
    pub fn new(streams: Vec<S>) -> Self {
        Self {
            streams: Mutex::new(streams.into()),
            connects: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Number of successful connections handed out so far
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S> Connector for ScriptedConnector<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    type Stream = S;

    async fn connect(&self) -> io::Result<S> {
        let next = self.streams.lock().unwrap().pop_front();
        match next {
            Some(stream) => {
                self.connects.fetch_add(1, Ordering::SeqCst);
                Ok(stream)
            }
            None => Err(io::ErrorKind::ConnectionRefused.into()),
        }
    }

    fn peer(&self) -> &str {
        "scripted"
    }
}

/// Returns immediately and remembers every requested delay
#[derive(Default)]
pub struct RecordingSleeper {
    calls: Mutex<Vec<Duration>>,
    stop_on_sleep: Option<StopFlag>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise `flag` the first time anyone sleeps
    pub fn stopping(flag: StopFlag) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            stop_on_sleep: Some(flag),
        }
    }

    pub fn calls(&self) -> Vec<Duration> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.calls.lock().unwrap().push(duration);
        if let Some(flag) = &self.stop_on_sleep {
            flag.stop();
        }
    }
}
