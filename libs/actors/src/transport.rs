//! Remote Transport
//!
//! Outbound: one unbounded queue per destination address, drained by a
//! dedicated worker that owns a single long-lived connection. The first send
//! to a destination lazily spawns the worker. Frames are written one after
//! another without waiting for the peer to handle them, so senders never
//! block on network round trips and per-destination order is preserved.
//!
//! Inbound: a listener task accepts peers and runs one reader task per
//! connection, delivering envelopes inline in arrival order.
//!
//! Failures are at-most-once: a dial or write failure is reported, the
//! destination's queue is closed, and later messages to it are dropped.

use crate::error::{ActorError, ErrorSink};
use crate::mailbox::Mailbox;
use crate::messages::{encode, RemoteEnvelope};
use crate::reference::ActorRef;
use crate::system::ActorSystem;
use network::{FrameSink, TcpConnection, TransportConfig};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

struct OutboundState {
    queues: HashMap<String, Arc<Mailbox<RemoteEnvelope>>>,
    closed: bool,
}

/// Per-destination outbound queues and their workers
pub(crate) struct RemoteTransport {
    config: TransportConfig,
    errors: ErrorSink,
    runtime: Handle,
    state: Mutex<OutboundState>,
}

impl RemoteTransport {
    pub(crate) fn new(config: TransportConfig, errors: ErrorSink, runtime: Handle) -> Self {
        Self {
            config,
            errors,
            runtime,
            state: Mutex::new(OutboundState {
                queues: HashMap::new(),
                closed: false,
            }),
        }
    }

    /// Queue a payload for a remote target; never blocks
    pub(crate) fn send(&self, target: ActorRef, payload: Vec<u8>) {
        let queue = {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            match state.queues.get(&target.address) {
                Some(queue) => queue.clone(),
                None => {
                    let queue = Arc::new(Mailbox::new());
                    state.queues.insert(target.address.clone(), queue.clone());
                    self.runtime.spawn(send_loop(
                        target.address.clone(),
                        queue.clone(),
                        self.config.clone(),
                        self.errors.clone(),
                    ));
                    queue
                }
            }
        };
        queue.push(RemoteEnvelope::new(target, payload));
    }

    /// Close every queue; workers exit on their next pop
    pub(crate) fn close(&self) {
        let queues = {
            let mut state = self.state.lock();
            state.closed = true;
            std::mem::take(&mut state.queues)
        };
        for queue in queues.values() {
            queue.close();
        }
    }
}

async fn send_loop(
    address: String,
    queue: Arc<Mailbox<RemoteEnvelope>>,
    config: TransportConfig,
    errors: ErrorSink,
) {
    let connection = match TcpConnection::connect(&address, &config).await {
        Ok(connection) => connection,
        Err(e) => {
            queue.close();
            errors.report(ActorError::transport(&address, e));
            return;
        }
    };
    debug!(address = %address, "Remote send worker connected");

    let (_reader, writer) = connection.into_split();
    let mut sink = FrameSink::new(writer, config.artificial_latency);

    loop {
        let envelope = tokio::select! {
            envelope = queue.pop() => match envelope {
                Some(envelope) => envelope,
                None => break,
            },
            e = sink.failed() => {
                queue.close();
                errors.report(ActorError::transport(&address, e));
                return;
            }
        };
        let frame = match encode(&envelope) {
            Ok(frame) => frame,
            Err(e) => {
                errors.report(e);
                continue;
            }
        };
        trace!(address = %address, bytes = frame.len(), "Sending remote frame");
        if let Err(e) = sink.send_frame(&frame).await {
            queue.close();
            errors.report(ActorError::transport(&address, e));
            return;
        }
    }
    debug!(address = %address, "Remote send worker stopped");
}

/// Accept inbound peers until shutdown
pub(crate) fn spawn_listener(
    listener: TcpListener,
    system: ActorSystem,
    config: TransportConfig,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => match TcpConnection::from_stream(stream, &config) {
                        Ok(connection) => {
                            debug!(peer = %peer, "Accepted remote peer");
                            tokio::spawn(read_loop(connection, system.clone(), shutdown.clone()));
                        }
                        Err(e) => warn!(peer = %peer, error = %e, "Failed to set up inbound connection"),
                    },
                    Err(e) => warn!(error = %e, "Inbound accept failed"),
                },
                _ = shutdown.changed() => break,
            }
        }
        debug!(address = %system.address(), "Inbound listener stopped");
    })
}

/// Deliver envelopes from one peer strictly in arrival order
async fn read_loop(
    connection: TcpConnection,
    system: ActorSystem,
    mut shutdown: watch::Receiver<bool>,
) {
    let peer = connection.peer_addr();
    let (mut reader, _writer) = connection.into_split();
    loop {
        tokio::select! {
            frame = reader.recv_value::<RemoteEnvelope>() => match frame {
                Ok(Some(envelope)) => system.deliver_from_remote(envelope),
                Ok(None) => break,
                Err(e) => {
                    system.report(ActorError::transport(peer.to_string(), e));
                    break;
                }
            },
            _ = shutdown.changed() => break,
        }
    }
    debug!(peer = %peer, "Inbound reader stopped");
}

#[cfg(test)]
mod tests {
    use crate::{ActorBehavior, ActorContext, ActorRef, ActorSystem, Result, SystemConfig};
    use async_trait::async_trait;
    use network::TransportConfig;
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    #[derive(Serialize, Deserialize)]
    enum SinkMessage {
        Push(u32),
        Dump(ActorRef),
    }

    struct Collector {
        ctx: ActorContext,
        seen: Vec<u32>,
    }

    #[async_trait]
    impl ActorBehavior for Collector {
        type Message = SinkMessage;

        async fn handle(&mut self, msg: SinkMessage) -> Result<()> {
            match msg {
                SinkMessage::Push(v) => self.seen.push(v),
                SinkMessage::Dump(reply_to) => self.ctx.tell(&reply_to, &self.seen),
            }
            Ok(())
        }
    }

    async fn pair(latency: Duration) -> (ActorSystem, ActorSystem) {
        let transport = TransportConfig::default().with_latency(latency);
        let sender = ActorSystem::new(SystemConfig::default().with_transport(transport))
            .await
            .unwrap();
        let receiver = ActorSystem::new(SystemConfig::default()).await.unwrap();
        (sender, receiver)
    }

    async fn collected(via: &ActorSystem, actor: &ActorRef) -> Vec<u32> {
        let (reply_to, rx) = via.new_channel_ref::<Vec<u32>>();
        via.tell(actor, &SinkMessage::Dump(reply_to));
        rx.recv_timeout(Duration::from_secs(5)).await.unwrap()
    }

    #[tokio::test]
    async fn test_remote_order_is_preserved() {
        let (sender, receiver) = pair(Duration::ZERO).await;
        let actor = receiver.spawn(|ctx| Collector { ctx, seen: Vec::new() });

        for i in 0..1000 {
            sender.tell(&actor, &SinkMessage::Push(i));
        }
        // Dump travels the same sender→actor path, so it lands after the pushes
        assert_eq!(collected(&sender, &actor).await, (0..1000).collect::<Vec<_>>());

        let received = receiver.stats();
        assert!(received.remote_bytes_received > 0);
        assert_eq!(received.messages_sent_external, 0);
        assert_eq!(sender.stats().messages_sent_external, 1001);

        sender.close().await;
        receiver.close().await;
    }

    #[tokio::test]
    async fn test_remote_order_under_latency_and_tell_does_not_block() {
        let latency = Duration::from_millis(300);
        let (sender, receiver) = pair(latency).await;
        let actor = receiver.spawn(|ctx| Collector { ctx, seen: Vec::new() });

        let start = Instant::now();
        for i in 0..100 {
            sender.tell(&actor, &SinkMessage::Push(i));
        }
        assert!(start.elapsed() < latency);

        assert_eq!(collected(&sender, &actor).await, (0..100).collect::<Vec<_>>());
        assert!(start.elapsed() >= latency);

        sender.close().await;
        receiver.close().await;
    }

    #[tokio::test]
    async fn test_unreachable_destination_is_reported_once_and_dropped() {
        let sender = ActorSystem::new(SystemConfig::default()).await.unwrap();
        let errors = Arc::new(AtomicUsize::new(0));
        let counter = errors.clone();
        sender.on_error(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        // Reserve a port, then free it so nothing listens there
        let unused = {
            let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            probe.local_addr().unwrap().port()
        };
        let target = ActorRef::new(format!("127.0.0.1:{}", unused), 0);
        sender.tell(&target, &SinkMessage::Push(1));
        tokio::time::sleep(Duration::from_millis(300)).await;
        sender.tell(&target, &SinkMessage::Push(2));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(errors.load(Ordering::SeqCst), 1);
        sender.close().await;
    }
}
