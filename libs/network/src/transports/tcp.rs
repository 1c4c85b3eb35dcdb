//! TCP Network Transport Implementation
//!
//! Length-prefixed framing over a single TCP stream. A connection is split
//! into an independent reader and writer so one task can drain inbound frames
//! while another writes.

use super::TransportConfig;
use crate::{Result, TransportError};
use bytes::{Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, trace, warn};

/// Size of the frame length prefix
const LENGTH_PREFIX: usize = 4;

/// TCP connection wrapper holding both halves before they are split
pub struct TcpConnection {
    stream: TcpStream,
    peer_addr: SocketAddr,
    max_frame_size: usize,
}

impl TcpConnection {
    /// Dial `address` (a `host:port` string) with the configured timeout
    pub async fn connect(address: &str, config: &TransportConfig) -> Result<Self> {
        debug!(address = %address, "Connecting to TCP peer");

        let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(address))
            .await
            .map_err(|_| {
                TransportError::timeout("TCP connect", config.connect_timeout.as_millis() as u64)
            })?
            .map_err(|source| TransportError::Connect {
                address: address.to_string(),
                source,
            })?;

        Self::from_stream(stream, config)
    }

    /// Wrap an accepted stream
    pub fn from_stream(stream: TcpStream, config: &TransportConfig) -> Result<Self> {
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }

        let peer_addr = stream.peer_addr()?;

        debug!(peer = %peer_addr, "TCP connection established");

        Ok(Self {
            stream,
            peer_addr,
            max_frame_size: config.max_frame_size,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Split into independently owned reader and writer
    pub fn into_split(self) -> (FrameReader, FrameWriter) {
        let (read_half, write_half) = self.stream.into_split();
        let now = Instant::now();
        (
            FrameReader {
                half: read_half,
                peer_addr: self.peer_addr,
                max_frame_size: self.max_frame_size,
                read_buffer: BytesMut::with_capacity(crate::DEFAULT_TCP_BUFFER_SIZE),
                bytes_received: 0,
                connected_at: now,
            },
            FrameWriter {
                half: write_half,
                peer_addr: self.peer_addr,
                write_buffer: BytesMut::with_capacity(crate::DEFAULT_TCP_BUFFER_SIZE),
                bytes_sent: 0,
                connected_at: now,
            },
        )
    }
}

/// Writing half of a framed connection
pub struct FrameWriter {
    half: OwnedWriteHalf,
    peer_addr: SocketAddr,
    /// Reusable write buffer
    write_buffer: BytesMut,
    bytes_sent: u64,
    connected_at: Instant,
}

impl FrameWriter {
    /// Send one frame with length prefix
    pub async fn send_frame(&mut self, data: &[u8]) -> Result<()> {
        let len = u32::try_from(data.len()).map_err(|_| TransportError::FrameTooLarge {
            size: data.len(),
            max: u32::MAX as usize,
        })?;

        self.write_buffer.clear();
        self.write_buffer.extend_from_slice(&len.to_be_bytes());
        self.write_buffer.extend_from_slice(data);

        // Single write call for the prefix and payload
        self.half
            .write_all(&self.write_buffer)
            .await
            .map_err(|e| TransportError::io(self.peer_addr, e))?;

        self.half
            .flush()
            .await
            .map_err(|e| TransportError::io(self.peer_addr, e))?;

        self.bytes_sent += (LENGTH_PREFIX + data.len()) as u64;

        trace!(
            peer = %self.peer_addr,
            bytes = data.len(),
            total_sent = self.bytes_sent,
            "Sent frame over TCP"
        );

        Ok(())
    }

    /// Encode `value` with bincode and send it as one frame
    pub async fn send_value<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let bytes = bincode::serialize(value)?;
        self.send_frame(&bytes).await
    }

    /// Shut down the write side
    pub async fn close(&mut self) -> Result<()> {
        self.half
            .shutdown()
            .await
            .map_err(|e| TransportError::io(self.peer_addr, e))?;
        debug!(peer = %self.peer_addr, "Closed TCP write half");
        Ok(())
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn stats(&self) -> TcpConnectionStats {
        TcpConnectionStats {
            peer_addr: self.peer_addr,
            connected_duration: self.connected_at.elapsed(),
            bytes: self.bytes_sent,
        }
    }
}

/// Reading half of a framed connection
pub struct FrameReader {
    half: OwnedReadHalf,
    peer_addr: SocketAddr,
    max_frame_size: usize,
    /// Reusable read buffer
    read_buffer: BytesMut,
    bytes_received: u64,
    connected_at: Instant,
}

impl FrameReader {
    /// Receive one frame; `None` once the peer closes the stream
    pub async fn recv_frame(&mut self) -> Result<Option<Bytes>> {
        let mut len_bytes = [0u8; LENGTH_PREFIX];
        match self.half.read_exact(&mut len_bytes).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                debug!(peer = %self.peer_addr, "Peer closed TCP stream");
                return Ok(None);
            }
            Err(e) => return Err(TransportError::io(self.peer_addr, e)),
        }

        let frame_len = u32::from_be_bytes(len_bytes) as usize;
        if frame_len > self.max_frame_size {
            return Err(TransportError::FrameTooLarge {
                size: frame_len,
                max: self.max_frame_size,
            });
        }

        self.read_buffer.resize(frame_len, 0);
        self.half
            .read_exact(&mut self.read_buffer)
            .await
            .map_err(|e| TransportError::io(self.peer_addr, e))?;

        self.bytes_received += (LENGTH_PREFIX + frame_len) as u64;

        trace!(
            peer = %self.peer_addr,
            bytes = frame_len,
            total_received = self.bytes_received,
            "Received frame over TCP"
        );

        Ok(Some(self.read_buffer.split_to(frame_len).freeze()))
    }

    /// Receive one frame and decode it with bincode
    pub async fn recv_value<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        match self.recv_frame().await? {
            Some(frame) => Ok(Some(bincode::deserialize(&frame)?)),
            None => Ok(None),
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn stats(&self) -> TcpConnectionStats {
        TcpConnectionStats {
            peer_addr: self.peer_addr,
            connected_duration: self.connected_at.elapsed(),
            bytes: self.bytes_received,
        }
    }
}

/// TCP connection statistics for one direction
#[derive(Debug, Clone)]
pub struct TcpConnectionStats {
    pub peer_addr: SocketAddr,
    pub connected_duration: Duration,
    pub bytes: u64,
}
