//! # Error Taxonomy
//!
//! Every failure the client can report, from dialing the daemon down to a
//! setter rejecting an argument. Warnings are not errors; they are recorded on
//! the result instead.

use thiserror::Error;

use crate::protocol::SearchdStatus;

/// Result type used across the client.
pub type SphinxResult<T> = Result<T, SphinxError>;

/// Errors surfaced by the searchd client.
#[derive(Debug, Error)]
pub enum SphinxError {
    /// Dial failed or did not complete within the connect timeout.
    #[error("failed to connect to {addr}: {source}")]
    Connection {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Read or write failure on an established connection.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Handshake bytes did not match the expected protocol marker.
    #[error("protocol version mismatch: daemon sent {received:02x?}")]
    VersionMismatch { received: [u8; 4] },

    /// Daemon answered with a command version older than the client speaks.
    #[error("daemon command version {daemon:#06x} is older than client version {client:#06x}")]
    CommandVersion { daemon: u16, client: u16 },

    /// Daemon reported an error, retry or unknown status.
    #[error("searchd {}: {message}", status_name(.status))]
    Daemon { status: u32, message: String },

    /// Payload ended before the announced counts were satisfied.
    #[error("malformed response: {context}")]
    Malformed { context: String },

    /// Caller supplied an illegal configuration value.
    #[error("invalid parameter {param}: {value}")]
    InvalidParameter { param: &'static str, value: String },
}

impl SphinxError {
    /// Builds a malformed-response error.
    pub fn malformed(context: impl Into<String>) -> Self {
        SphinxError::Malformed {
            context: context.into(),
        }
    }

    /// Builds an invalid-parameter error naming the parameter and value.
    pub fn invalid(param: &'static str, value: impl std::fmt::Display) -> Self {
        SphinxError::InvalidParameter {
            param,
            value: value.to_string(),
        }
    }

    /// True when re-issuing the same call may succeed.
    ///
    /// The client never retries on its own; this only classifies the error.
    pub fn is_retryable(&self) -> bool {
        match self {
            SphinxError::Connection { .. } => true,
            SphinxError::Daemon { status, .. } => {
                SearchdStatus::from_u32(*status) == Some(SearchdStatus::Retry)
            }
            _ => false,
        }
    }
}

fn status_name(status: &u32) -> &'static str {
    SearchdStatus::from_u32(*status)
        .map(SearchdStatus::name)
        .unwrap_or("UNKNOWN")
}
