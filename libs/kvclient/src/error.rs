//! Client errors

use network::TransportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Dial, write or read failure
    #[error("Transport error talking to {addr}: {source}")]
    Transport {
        addr: String,
        #[source]
        source: TransportError,
    },

    /// Server closed the connection before answering
    #[error("Connection to {addr} closed before a response arrived")]
    Closed { addr: String },

    #[error("No response from {addr} within {timeout_ms}ms")]
    Timeout { addr: String, timeout_ms: u64 },

    /// Server could not answer (partition timed out or shut down)
    #[error("Server error: {message}")]
    Server { message: String },

    #[error("Unexpected response to {request}: {response}")]
    UnexpectedResponse {
        request: &'static str,
        response: String,
    },

    #[error("Router has no addresses")]
    NoAddresses,
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    pub fn transport(addr: impl Into<String>, source: TransportError) -> Self {
        Self::Transport {
            addr: addr.into(),
            source,
        }
    }
}
