//! LotteryClient Library
//!
//! A Rust library for agency clients of a lottery server: bets are sent in
//! size-bounded binary batches over TCP, and once every agency is done the
//! client polls the server for its winners.

pub mod client;
pub mod common;
pub mod config;
pub mod protocol;
pub mod source;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use client::{ClientSettings, LoopSummary, LotteryClient, RunReport};
pub use common::errors::{ClientError, Result};
pub use common::traits::{Connector, Sleeper, TokioSleeper};
pub use common::types::{Batch, Bet, StopFlag, WinnersQuery};
pub use config::types::AppConfig;
pub use protocol::{ProtocolDriver, Session, TcpConnector};
pub use source::{AgencyFileSource, BetSource, MemoryBetSource};
