//! Error types for TN3270R
//!
//! All public operations return [`TN3270Result`]. The variants carry enough
//! context to tell a scripting failure (bad input, locked keyboard) apart
//! from a connection-level failure.

use std::io;

use thiserror::Error;

/// Convenience alias used throughout the crate
pub type TN3270Result<T> = Result<T, TN3270Error>;

/// Top-level error type for TN3270R operations
#[derive(Debug, Error)]
pub enum TN3270Error {
    /// Connection establishment or transport failure
    #[error("connection error: {reason}")]
    Connection { reason: String },

    /// Telnet option negotiation did not reach the required state
    #[error("negotiation failed with {host}:{port}: {reason}")]
    Negotiation {
        host: String,
        port: u16,
        reason: String,
    },

    /// Malformed 3270 data stream
    ///
    /// Raised internally by the decoder and absorbed by the session,
    /// which logs the record and keeps the connection alive.
    #[error("protocol error: {reason}")]
    Protocol { reason: String },

    /// An attention or input operation arrived while the host holds the keyboard
    #[error("keyboard is locked")]
    KeyboardLocked,

    /// A wait operation gave up
    #[error("timed out after {seconds}s waiting for {operation}")]
    Timeout { operation: String, seconds: u64 },

    /// Caller-supplied input was rejected before anything was sent
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// The session has been disconnected
    #[error("session closed")]
    SessionClosed,
}

impl TN3270Error {
    /// Shorthand for a [`TN3270Error::Protocol`] with a formatted reason
    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol {
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`TN3270Error::InvalidInput`] with a formatted reason
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }
}

impl From<io::Error> for TN3270Error {
    fn from(err: io::Error) -> Self {
        Self::Connection {
            reason: err.to_string(),
        }
    }
}
