//! Sender-side latency injection
//!
//! `DelayedWriter` queues frames and hands them to a background task that
//! writes each one no earlier than `latency` after it was queued. Queueing
//! never waits on the network, and frames leave in queue order. A write
//! failure stops the task; the error is returned by the next `send_frame`
//! or by `failed`, whichever asks first.

use super::tcp::FrameWriter;
use crate::{Result, TransportError};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Frame writer that delays every frame by a fixed latency
pub struct DelayedWriter {
    queue: mpsc::UnboundedSender<(Instant, Vec<u8>)>,
    peer_addr: SocketAddr,
    latency: Duration,
    failure: Option<oneshot::Receiver<TransportError>>,
}

impl DelayedWriter {
    /// Move `writer` into a background task; must be called inside a tokio runtime
    pub fn spawn(mut writer: FrameWriter, latency: Duration) -> Self {
        let peer_addr = writer.peer_addr();
        let (tx, mut rx) = mpsc::unbounded_channel::<(Instant, Vec<u8>)>();
        let (failure_tx, failure_rx) = oneshot::channel();

        tokio::spawn(async move {
            while let Some((due, frame)) = rx.recv().await {
                tokio::time::sleep_until(due).await;
                if let Err(e) = writer.send_frame(&frame).await {
                    warn!(peer = %peer_addr, error = %e, "Delayed frame write failed");
                    rx.close();
                    let _ = failure_tx.send(e);
                    return;
                }
            }
            debug!(peer = %peer_addr, "Delayed writer drained");
        });

        Self {
            queue: tx,
            peer_addr,
            latency,
            failure: Some(failure_rx),
        }
    }

    /// Queue a frame for delayed delivery
    pub fn send_frame(&mut self, data: &[u8]) -> Result<()> {
        if let Some(failure) = self.failure.as_mut() {
            if let Ok(e) = failure.try_recv() {
                self.failure = None;
                return Err(e);
            }
        }
        let due = Instant::now() + self.latency;
        self.queue
            .send((due, data.to_vec()))
            .map_err(|_| TransportError::Closed {
                peer: self.peer_addr,
            })
    }
}

impl DelayedWriter {
    /// Resolve with the error that stopped the background writer
    ///
    /// Pending forever if the writer never fails or the error was already
    /// returned by `send_frame`.
    pub async fn failed(&mut self) -> TransportError {
        if let Some(failure) = self.failure.as_mut() {
            if let Ok(e) = failure.await {
                self.failure = None;
                return e;
            }
            self.failure = None;
        }
        std::future::pending().await
    }
}

/// Outbound frame destination, with or without injected latency
pub enum FrameSink {
    Direct(FrameWriter),
    Delayed(DelayedWriter),
}

impl FrameSink {
    /// Pick the direct writer when `latency` is zero
    pub fn new(writer: FrameWriter, latency: Duration) -> Self {
        if latency.is_zero() {
            FrameSink::Direct(writer)
        } else {
            FrameSink::Delayed(DelayedWriter::spawn(writer, latency))
        }
    }

    pub async fn send_frame(&mut self, data: &[u8]) -> Result<()> {
        match self {
            FrameSink::Direct(writer) => writer.send_frame(data).await,
            FrameSink::Delayed(writer) => writer.send_frame(data),
        }
    }

    /// Resolve with a write failure that happened off the send path
    ///
    /// Direct writes report failures from `send_frame` itself, so this
    /// never resolves for them.
    pub async fn failed(&mut self) -> TransportError {
        match self {
            FrameSink::Direct(_) => std::future::pending().await,
            FrameSink::Delayed(writer) => writer.failed().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transports::{TcpConnection, TransportConfig};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_delayed_frames_keep_order_without_blocking() {
        let config = TransportConfig::default();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let accept = tokio::spawn(async move { listener.accept().await.unwrap().0 });

        let client = TcpConnection::connect(&addr, &config).await.unwrap();
        let server = TcpConnection::from_stream(accept.await.unwrap(), &config).unwrap();
        let (_r, writer) = client.into_split();
        let (mut reader, _w) = server.into_split();

        let latency = Duration::from_millis(200);
        let mut sink = FrameSink::new(writer, latency);

        let start = std::time::Instant::now();
        for i in 0..20u8 {
            sink.send_frame(&[i]).await.unwrap();
        }
        // Queueing twenty frames must not cost twenty latencies
        assert!(start.elapsed() < latency);

        for i in 0..20u8 {
            let frame = reader.recv_frame().await.unwrap().unwrap();
            assert_eq!(&frame[..], &[i]);
        }
        assert!(start.elapsed() >= latency);
        assert!(start.elapsed() < latency * 5);
    }

    #[tokio::test]
    async fn test_background_write_failure_is_reported() {
        let config = TransportConfig::default();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let accept = tokio::spawn(async move { listener.accept().await.unwrap().0 });

        let client = TcpConnection::connect(&addr, &config).await.unwrap();
        drop(accept.await.unwrap());
        let (_r, writer) = client.into_split();
        let mut sink = FrameSink::new(writer, Duration::from_millis(5));

        let mut reported = None;
        for _ in 0..200 {
            if let Err(e) = sink.send_frame(&[0u8; 1024]).await {
                reported = Some(e);
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let err = match reported {
            Some(e) => e,
            None => tokio::time::timeout(Duration::from_secs(2), sink.failed())
                .await
                .expect("write failure was never surfaced"),
        };
        assert_eq!(err.category(), "io");
        assert!(matches!(err, TransportError::Io { .. }));
    }
}
