//! Error types for the application

use std::io;

use thiserror::Error;

use crate::protocol::codec::CodecError;

/// Result type alias using our ClientError
pub type Result<T> = std::result::Result<T, ClientError>;

/// Main error type for client operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// A batch was refused before touching the connection
    #[error("Batch of {len} bets exceeds the limit of {max}")]
    BatchTooLarge { len: usize, max: usize },

    /// A batch with no bets; the zero count is reserved for end-of-bets
    #[error("Batch has no bets")]
    EmptyBatch,

    /// The batch cap itself is unusable
    #[error("Invalid batch size: {0} (must be between 1 and 255)")]
    InvalidBatchSize(usize),

    /// Could not establish the stream connection
    #[error("Connection error: {0}")]
    Connection(#[source] io::Error),

    /// Read/write failure on an established connection
    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    /// The peer closed the stream in the middle of a message
    #[error("Connection closed by peer after {received} of {expected} bytes")]
    PeerClosed { expected: usize, received: usize },

    /// An operation needed a live connection but the session has none
    #[error("There is no connection")]
    NotConnected,

    /// The byte stream did not follow the protocol
    #[error("Protocol error: {0}")]
    Protocol(#[from] CodecError),

    /// The server answered a batch with a non-zero status
    #[error("Batch rejected by server with status {status}")]
    BatchRejected { status: u8 },

    /// The bet data could not be read
    #[error("Bet source error: {0}")]
    Source(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ClientError {
    /// True for failures detected locally, before any I/O was issued
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ClientError::BatchTooLarge { .. }
                | ClientError::EmptyBatch
                | ClientError::InvalidBatchSize(_)
        )
    }

    /// True for failures of the underlying connection
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ClientError::Connection(_)
                | ClientError::Transport(_)
                | ClientError::PeerClosed { .. }
                | ClientError::NotConnected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(ClientError::BatchTooLarge { len: 256, max: 255 }.is_validation());
        assert!(ClientError::InvalidBatchSize(0).is_validation());
        assert!(ClientError::EmptyBatch.is_validation());
        assert!(ClientError::PeerClosed {
            expected: 2,
            received: 1
        }
        .is_transport());
        assert!(!ClientError::BatchRejected { status: 1 }.is_transport());
        assert!(!ClientError::Protocol(CodecError::UnknownTag(9)).is_validation());
    }

    #[test]
    fn test_error_messages() {
        let err = ClientError::PeerClosed {
            expected: 4,
            received: 1,
        };
        assert_eq!(
            err.to_string(),
            "Connection closed by peer after 1 of 4 bytes"
        );
    }
}
