//! Actor System Core
//!
//! Owns the registry, the remote transport and the inbound listener of one
//! runtime instance. Several instances can live in one process; each is
//! identified by the `host:port` its listener is bound to.
//!
//! # Send path
//!
//! Every `tell` encodes immediately, so encoding cost and failures belong to
//! the caller. The payload is then routed by target address:
//!
//! 1. local actor: pushed onto its mailbox
//! 2. local response channel: claimed (first claim wins), decoded, completed
//! 3. remote: queued on the per-destination outbound worker
//!
//! Nothing on this path awaits, so `tell` is safe to call from handlers and
//! from plain threads.
//!
//! # Lifecycle
//!
//! `close()` flips the closed flag under the lifecycle write lock, then closes
//! every mailbox and outbound queue. Spawns and channel creation take the read
//! lock, so anything registered before the flip is guaranteed to be closed by
//! it. After close every send is a silent drop.

use crate::context::ActorContext;
use crate::error::{ActorError, ErrorSink, Result};
use crate::mailbox::Mailbox;
use crate::messages::{decode, encode, RemoteEnvelope};
use crate::metrics::{SendOrigin, SendStats, Stats, SystemMetrics};
use crate::reference::ActorRef;
use crate::registry::{ActorRegistry, ChannelReceiver, Route};
use crate::transport::{spawn_listener, RemoteTransport};
use async_trait::async_trait;
use network::TransportConfig;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct SystemConfig {
    /// Host part of the runtime address
    pub host: String,
    /// Listener port; 0 picks an ephemeral port
    pub port: u16,
    pub transport: TransportConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            transport: TransportConfig::default(),
        }
    }
}

impl SystemConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            transport: TransportConfig::default(),
        }
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }
}

/// Behavior of an actor
///
/// Handlers run one at a time on the actor's own task. They must not block;
/// anything they need from other actors is requested with a `tell` carrying
/// a reply ref.
#[async_trait]
pub trait ActorBehavior: Send + 'static {
    /// Closed set of messages this actor understands
    type Message: DeserializeOwned + Send + 'static;

    /// Handle one message
    async fn handle(&mut self, msg: Self::Message) -> Result<()>;

    /// Called before the first message
    async fn on_start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called once the mailbox is closed
    async fn on_stop(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Handle to a runtime instance; cheap to clone
#[derive(Clone)]
pub struct ActorSystem {
    inner: Arc<SystemInner>,
}

struct SystemInner {
    address: String,
    registry: ActorRegistry,
    metrics: SystemMetrics,
    errors: ErrorSink,
    transport: RemoteTransport,
    runtime: Handle,
    /// Guards spawn/channel creation against close
    lifecycle: RwLock<bool>,
    /// Hot-path copy of the lifecycle flag
    closed: AtomicBool,
    shutdown: watch::Sender<bool>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl ActorSystem {
    /// Bind the inbound listener and start the runtime
    pub async fn new(config: SystemConfig) -> Result<Self> {
        let bind_addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| ActorError::Startup {
                message: format!("failed to bind {}", bind_addr),
                source: e,
            })?;
        let local = listener.local_addr().map_err(|e| ActorError::Startup {
            message: "failed to read listener address".to_string(),
            source: e,
        })?;
        let address = format!("{}:{}", config.host, local.port());

        let runtime = Handle::current();
        let errors = ErrorSink::default();
        let (shutdown, shutdown_rx) = watch::channel(false);

        let system = Self {
            inner: Arc::new(SystemInner {
                address: address.clone(),
                registry: ActorRegistry::new(),
                metrics: SystemMetrics::default(),
                transport: RemoteTransport::new(
                    config.transport.clone(),
                    errors.clone(),
                    runtime.clone(),
                ),
                errors,
                runtime,
                lifecycle: RwLock::new(false),
                closed: AtomicBool::new(false),
                shutdown,
                listener: Mutex::new(None),
            }),
        };

        let handle = spawn_listener(listener, system.clone(), config.transport, shutdown_rx);
        *system.inner.listener.lock() = Some(handle);

        info!(address = %address, "Actor system started");
        Ok(system)
    }

    /// `host:port` identifying this runtime
    pub fn address(&self) -> &str {
        &self.inner.address
    }

    pub fn is_local(&self, target: &ActorRef) -> bool {
        target.address == self.inner.address
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Start an actor; `make` receives the actor's context
    ///
    /// Returns a permanently inert ref once the system is closed.
    pub fn spawn<A, F>(&self, make: F) -> ActorRef
    where
        A: ActorBehavior,
        F: FnOnce(ActorContext) -> A,
    {
        let mailbox = Arc::new(Mailbox::new());
        let sends = Arc::new(SendStats::new());
        let self_ref = {
            let closed = self.inner.lifecycle.read();
            if *closed {
                return ActorRef::dead(self.address());
            }
            let counter = self.inner.registry.next_counter();
            self.inner
                .registry
                .insert_actor(counter, mailbox.clone(), sends.clone());
            ActorRef::new(self.address(), counter)
        };

        let ctx = ActorContext::new(self.clone(), self_ref.clone(), sends);
        let task = ActorTask {
            actor: make(ctx),
            mailbox,
            self_ref: self_ref.clone(),
            errors: self.inner.errors.clone(),
        };
        self.inner.runtime.spawn(task.run());

        debug!(actor = %self_ref, "Actor spawned");
        self_ref
    }

    /// Create a ref that accepts exactly one message of type `M`
    pub fn new_channel_ref<M>(&self) -> (ActorRef, ChannelReceiver<M>)
    where
        M: DeserializeOwned + Send + 'static,
    {
        let closed = self.inner.lifecycle.read();
        if *closed {
            return (ActorRef::dead(self.address()), ChannelReceiver::closed());
        }
        let (counter, receiver) = self.inner.registry.new_channel();
        (ActorRef::new(self.address(), counter), receiver)
    }

    /// Fire-and-forget send from outside any actor
    pub fn tell<M: Serialize + ?Sized>(&self, target: &ActorRef, message: &M) {
        self.send(target, message, SendOrigin::External);
    }

    /// Deferred send from outside any actor; cannot be cancelled
    pub fn tell_after<M: Serialize + ?Sized>(&self, target: &ActorRef, message: &M, delay: Duration) {
        self.send_after(target, message, delay, SendOrigin::External);
    }

    /// Install or replace the error callback
    pub fn on_error<F>(&self, handler: F)
    where
        F: Fn(&ActorError) + Send + Sync + 'static,
    {
        self.inner.errors.set(Arc::new(handler));
    }

    pub fn stats(&self) -> Stats {
        let mut stats = self.inner.metrics.snapshot();
        stats.max_message_rate = self.inner.registry.max_message_rate();
        stats
    }

    /// Stop the listener, every actor and every outbound connection
    pub async fn close(&self) {
        {
            let mut closed = self.inner.lifecycle.write();
            if *closed {
                return;
            }
            *closed = true;
            self.inner.closed.store(true, Ordering::Release);
        }

        let _ = self.inner.shutdown.send(true);
        self.inner.registry.close_all();
        self.inner.transport.close();

        let listener = self.inner.listener.lock().take();
        if let Some(handle) = listener {
            let _ = handle.await;
        }
        info!(address = %self.inner.address, "Actor system closed");
    }

    pub(crate) fn send<M: Serialize + ?Sized>(&self, target: &ActorRef, message: &M, origin: SendOrigin) {
        if self.is_closed() {
            return;
        }
        match encode(message) {
            Ok(payload) => self.deliver(target, payload, origin),
            Err(e) => self.inner.errors.report(e),
        }
    }

    pub(crate) fn send_after<M: Serialize + ?Sized>(
        &self,
        target: &ActorRef,
        message: &M,
        delay: Duration,
        origin: SendOrigin,
    ) {
        if self.is_closed() {
            return;
        }
        let payload = match encode(message) {
            Ok(payload) => payload,
            Err(e) => {
                self.inner.errors.report(e);
                return;
            }
        };
        let system = self.clone();
        let target = target.clone();
        self.inner.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            system.deliver(&target, payload, origin);
        });
    }

    /// Entry point for envelopes read off an inbound connection
    pub(crate) fn deliver_from_remote(&self, envelope: RemoteEnvelope) {
        self.inner
            .metrics
            .record_remote_received(envelope.payload.len());
        if !self.is_local(&envelope.target) {
            self.inner
                .errors
                .report(ActorError::InvalidRef { target: envelope.target });
            return;
        }
        self.deliver(&envelope.target, envelope.payload, SendOrigin::Remote);
    }

    pub(crate) fn report(&self, error: ActorError) {
        self.inner.errors.report(error);
    }

    fn deliver(&self, target: &ActorRef, payload: Vec<u8>, origin: SendOrigin) {
        if self.is_closed() {
            return;
        }
        self.inner.metrics.record_send(origin, payload.len());

        if !self.is_local(target) {
            trace!(target = %target, bytes = payload.len(), "Queueing remote message");
            self.inner.transport.send(target.clone(), payload);
            return;
        }

        match self.inner.registry.route(target.counter) {
            Route::Actor(mailbox) => mailbox.push(payload),
            Route::Channel(deliver) => match deliver(&payload) {
                Ok(()) => self.inner.metrics.record_channel_used(),
                Err(e) => self.inner.errors.report(e),
            },
            Route::ChannelReused => self
                .inner
                .errors
                .report(ActorError::ChannelReused { target: target.clone() }),
            Route::Missing => self
                .inner
                .errors
                .report(ActorError::InvalidRef { target: target.clone() }),
        }
    }
}

/// One actor pinned to its mailbox
struct ActorTask<A: ActorBehavior> {
    actor: A,
    mailbox: Arc<Mailbox<Vec<u8>>>,
    self_ref: ActorRef,
    errors: ErrorSink,
}

impl<A: ActorBehavior> ActorTask<A> {
    async fn run(mut self) {
        if let Err(e) = self.actor.on_start().await {
            self.errors.report(e);
        }

        while let Some(payload) = self.mailbox.pop().await {
            match decode::<A::Message>(&payload) {
                Ok(msg) => {
                    if let Err(e) = self.actor.handle(msg).await {
                        self.errors.report(e);
                    }
                }
                Err(e) => self
                    .errors
                    .report(ActorError::unexpected_message(&self.self_ref, e.to_string())),
            }
        }

        if let Err(e) = self.actor.on_stop().await {
            self.errors.report(e);
        }
        debug!(actor = %self.self_ref, "Actor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, Serialize, Deserialize)]
    enum EchoMessage {
        Record(u32),
        Dump(ActorRef),
        Relay { to: ActorRef, value: u32 },
        Fail,
    }

    struct Echo {
        ctx: ActorContext,
        seen: Vec<u32>,
    }

    #[async_trait]
    impl ActorBehavior for Echo {
        type Message = EchoMessage;

        async fn handle(&mut self, msg: EchoMessage) -> Result<()> {
            match msg {
                EchoMessage::Record(v) => self.seen.push(v),
                EchoMessage::Dump(reply_to) => self.ctx.tell(&reply_to, &self.seen),
                EchoMessage::Relay { to, value } => {
                    self.ctx.tell(&to, &EchoMessage::Record(value))
                }
                EchoMessage::Fail => {
                    return Err(ActorError::handler(self.ctx.self_ref(), "asked to fail"))
                }
            }
            Ok(())
        }
    }

    fn spawn_echo(system: &ActorSystem) -> ActorRef {
        system.spawn(|ctx| Echo { ctx, seen: Vec::new() })
    }

    async fn dump(system: &ActorSystem, actor: &ActorRef) -> Vec<u32> {
        let (reply_to, rx) = system.new_channel_ref::<Vec<u32>>();
        system.tell(actor, &EchoMessage::Dump(reply_to));
        rx.recv_timeout(Duration::from_secs(2)).await.unwrap()
    }

    fn count_errors(system: &ActorSystem) -> Arc<AtomicUsize> {
        let errors = Arc::new(AtomicUsize::new(0));
        let counter = errors.clone();
        system.on_error(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        errors
    }

    #[tokio::test]
    async fn test_local_messages_arrive_in_order() {
        let system = ActorSystem::new(SystemConfig::default()).await.unwrap();
        let actor = spawn_echo(&system);
        for i in 0..500 {
            system.tell(&actor, &EchoMessage::Record(i));
        }
        assert_eq!(dump(&system, &actor).await, (0..500).collect::<Vec<_>>());
        system.close().await;
    }

    #[tokio::test]
    async fn test_actor_to_actor_sends_are_counted() {
        let system = ActorSystem::new(SystemConfig::default()).await.unwrap();
        let a = spawn_echo(&system);
        let b = spawn_echo(&system);
        system.tell(&a, &EchoMessage::Relay { to: b.clone(), value: 7 });
        system.tell(&a, &EchoMessage::Relay { to: b.clone(), value: 8 });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(dump(&system, &b).await, vec![7, 8]);

        let stats = system.stats();
        assert_eq!(stats.messages_sent_external, 3);
        // two relays plus the dump reply
        assert_eq!(stats.messages_sent_actor, 3);
        assert_eq!(stats.messages_sent, 6);
        assert_eq!(stats.channel_refs_used, 1);
        assert!(stats.bytes_sent > 0);
        assert!(stats.max_message_rate >= 2.0);
        system.close().await;
    }

    #[tokio::test]
    async fn test_channel_used_twice_is_reported() {
        let system = ActorSystem::new(SystemConfig::default()).await.unwrap();
        let errors = count_errors(&system);

        let (reply_to, rx) = system.new_channel_ref::<u32>();
        system.tell(&reply_to, &1u32);
        system.tell(&reply_to, &2u32);

        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(system.stats().channel_refs_used, 1);
        system.close().await;
    }

    #[tokio::test]
    async fn test_reply_to_abandoned_channel_is_reported() {
        let system = ActorSystem::new(SystemConfig::default()).await.unwrap();
        let errors = count_errors(&system);

        let (reply_to, rx) = system.new_channel_ref::<u32>();
        assert_eq!(rx.recv_timeout(Duration::from_millis(10)).await, None);
        system.tell(&reply_to, &1u32);

        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(system.stats().channel_refs_used, 0);
        system.close().await;
    }

    #[tokio::test]
    async fn test_unknown_and_failing_messages_do_not_stop_actor() {
        let system = ActorSystem::new(SystemConfig::default()).await.unwrap();
        let errors = count_errors(&system);
        let actor = spawn_echo(&system);

        system.tell(&actor, &"definitely not an echo message");
        system.tell(&actor, &EchoMessage::Fail);
        system.tell(&actor, &EchoMessage::Record(1));

        assert_eq!(dump(&system, &actor).await, vec![1]);
        assert_eq!(errors.load(Ordering::SeqCst), 2);
        system.close().await;
    }

    #[tokio::test]
    async fn test_invalid_local_ref_is_reported() {
        let system = ActorSystem::new(SystemConfig::default()).await.unwrap();
        let errors = count_errors(&system);
        system.tell(&ActorRef::new(system.address(), 9_999), &1u32);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        system.close().await;
    }

    #[tokio::test]
    async fn test_tell_after_delays_delivery() {
        let system = ActorSystem::new(SystemConfig::default()).await.unwrap();
        let (reply_to, rx) = system.new_channel_ref::<String>();
        let start = std::time::Instant::now();
        system.tell_after(&reply_to, "late", Duration::from_millis(100));

        assert_eq!(rx.recv().await.as_deref(), Some("late"));
        assert!(start.elapsed() >= Duration::from_millis(100));
        system.close().await;
    }

    #[tokio::test]
    async fn test_close_makes_everything_inert() {
        let system = ActorSystem::new(SystemConfig::default()).await.unwrap();
        let errors = count_errors(&system);
        let actor = spawn_echo(&system);
        let (pending, pending_rx) = system.new_channel_ref::<u32>();

        system.close().await;
        system.close().await;
        assert!(system.is_closed());

        system.tell(&actor, &EchoMessage::Record(1));
        system.tell(&pending, &1u32);
        assert_eq!(pending_rx.recv().await, None);

        let dead = spawn_echo(&system);
        assert!(dead.is_dead());
        let (dead_channel, rx) = system.new_channel_ref::<u32>();
        assert!(dead_channel.is_dead());
        assert_eq!(rx.recv().await, None);

        assert_eq!(errors.load(Ordering::SeqCst), 0);
        assert_eq!(system.stats().messages_sent, 0);
    }

    #[tokio::test]
    async fn test_multiple_systems_have_independent_registries() {
        let a = ActorSystem::new(SystemConfig::default()).await.unwrap();
        let b = ActorSystem::new(SystemConfig::default()).await.unwrap();
        assert_ne!(a.address(), b.address());

        let on_a = spawn_echo(&a);
        let on_b = spawn_echo(&b);
        assert!(a.is_local(&on_a));
        assert!(!a.is_local(&on_b));
        assert_eq!(on_a.counter, on_b.counter);

        a.close().await;
        b.close().await;
    }
}
