//! Wire protocol spoken with the lottery server
//!
//! - [`codec`]: byte layouts of bets and messages
//! - [`session`]: the stream connection and its exact read/write primitives
//! - [`driver`]: batch submission and the winners polling loop

pub mod codec;
pub mod driver;
pub mod session;

pub use driver::{ProtocolDriver, WINNERS_RETRY_BACKOFF};
pub use session::{Session, TcpConnector};
