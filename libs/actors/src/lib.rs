//! Actor Runtime
//!
//! Minimal actor system with location-transparent references. Every message
//! is encoded by the sender, then either pushed into a local mailbox, handed to
//! a one-shot response channel, or queued for the remote runtime that owns the
//! target reference.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐          ┌──────────────────────────┐
//! │  ActorSystem (host:A)    │          │  ActorSystem (host:B)    │
//! │                          │          │                          │
//! │  tell ──► registry ──┬──►│ mailbox  │                          │
//! │                      ├──►│ channel  │                          │
//! │                      └──►│ remote ──┼── TCP frames ──► inbound │
//! │                          │  queue   │   (one per peer) reader  │
//! └──────────────────────────┘          └──────────────────────────┘
//! ```
//!
//! # Guarantees
//!
//! - **At-most-once** delivery, no retries, no failure notification
//! - **Per-pair ordering**: messages from one sender to one target arrive in
//!   send order, local or remote
//! - **Actor isolation**: one task per actor, handlers never overlap
//!
//! # Examples
//!
//! ```rust,no_run
//! use actors::{ActorBehavior, ActorContext, ActorSystem, SystemConfig};
//! use async_trait::async_trait;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! enum CounterMessage {
//!     Add(i64),
//!     Get(actors::ActorRef),
//! }
//!
//! struct Counter {
//!     ctx: ActorContext,
//!     count: i64,
//! }
//!
//! #[async_trait]
//! impl ActorBehavior for Counter {
//!     type Message = CounterMessage;
//!
//!     async fn handle(&mut self, msg: CounterMessage) -> actors::Result<()> {
//!         match msg {
//!             CounterMessage::Add(n) => self.count += n,
//!             CounterMessage::Get(reply_to) => self.ctx.tell(&reply_to, &self.count),
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # async fn run() -> actors::Result<()> {
//! let system = ActorSystem::new(SystemConfig::default()).await?;
//! let counter = system.spawn(|ctx| Counter { ctx, count: 0 });
//! system.tell(&counter, &CounterMessage::Add(2));
//!
//! let (reply_to, reply) = system.new_channel_ref::<i64>();
//! system.tell(&counter, &CounterMessage::Get(reply_to));
//! assert_eq!(reply.recv().await, Some(2));
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod error;
pub mod mailbox;
pub mod messages;
pub mod metrics;
pub mod reference;
pub mod registry;
pub mod system;
pub mod transport;

pub use context::ActorContext;
pub use error::{ActorError, ErrorHandler, Result};
pub use mailbox::Mailbox;
pub use messages::{decode, encode, RemoteEnvelope};
pub use metrics::{SendStats, Stats, SystemMetrics};
pub use reference::ActorRef;
pub use registry::ChannelReceiver;
pub use system::{ActorBehavior, ActorSystem, SystemConfig};
