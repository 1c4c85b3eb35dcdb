//! Framed TCP Transport
//!
//! Every message on the wire is a 4-byte big-endian length prefix followed by
//! the payload. The same framing carries inter-runtime actor envelopes and
//! client query requests.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod latency;
pub mod tcp;

pub use latency::{DelayedWriter, FrameSink};
pub use tcp::{FrameReader, FrameWriter, TcpConnection, TcpConnectionStats};

/// Transport configuration shared by dialers and listeners
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Connection timeout when dialing a peer
    pub connect_timeout: Duration,
    /// Maximum accepted frame size
    pub max_frame_size: usize,
    /// Sender-side delay applied to every outbound frame (zero disables it)
    pub artificial_latency: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(crate::DEFAULT_CONNECTION_TIMEOUT_SECS),
            max_frame_size: crate::DEFAULT_MAX_FRAME_SIZE,
            artificial_latency: Duration::ZERO,
        }
    }
}

impl TransportConfig {
    /// Same configuration with a sender-side latency
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.artificial_latency = latency;
        self
    }
}
