//! Network Infrastructure
//!
//! Framed TCP connections used by the actor runtime's remote transport and by
//! the key-value query protocol, plus the sender-side latency injector used to
//! exercise ordering under slow links.

pub mod error;
pub mod transports;

// Re-export commonly used types
pub use error::{Result, TransportError};
pub use transports::{
    DelayedWriter, FrameReader, FrameSink, FrameWriter, TcpConnection, TcpConnectionStats,
    TransportConfig,
};

// Constants for configuration
pub const DEFAULT_TCP_BUFFER_SIZE: usize = 64 * 1024; // 64KB
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024; // 16MB
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 5;
