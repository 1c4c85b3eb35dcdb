//! Transport Error Types
//!
//! Failures of framed TCP connections: dialing, reading and writing frames,
//! and encoding the values carried in them.

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Main transport error type
#[derive(Error, Debug)]
pub enum TransportError {
    /// Dialing a peer failed
    #[error("Failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    /// An operation did not finish in time
    #[error("Timeout error: {operation} exceeded {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    /// Reading or writing an established connection failed
    #[error("I/O error on connection to {peer:?}: {source}")]
    Io {
        peer: Option<SocketAddr>,
        #[source]
        source: io::Error,
    },

    /// A frame length exceeds the configured maximum
    #[error("Frame of {size} bytes exceeds maximum {max}")]
    FrameTooLarge { size: usize, max: usize },

    /// Frame payload could not be encoded or decoded
    #[error("Frame codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// The writer behind a connection has already stopped
    #[error("Connection to {peer} is closed")]
    Closed { peer: SocketAddr },
}

/// Result type alias for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

impl TransportError {
    pub fn timeout(operation: &'static str, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation,
            timeout_ms,
        }
    }

    /// I/O failure on a connection to `peer`
    pub fn io(peer: SocketAddr, source: io::Error) -> Self {
        Self::Io {
            peer: Some(peer),
            source,
        }
    }

    /// Whether retrying on a fresh connection could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::Connect { .. }
                | TransportError::Timeout { .. }
                | TransportError::Io { .. }
                | TransportError::Closed { .. }
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            TransportError::Connect { .. } => "connect",
            TransportError::Timeout { .. } => "timeout",
            TransportError::Io { .. } | TransportError::Closed { .. } => "io",
            TransportError::FrameTooLarge { .. } | TransportError::Codec(_) => "framing",
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(source: io::Error) -> Self {
        TransportError::Io { peer: None, source }
    }
}
