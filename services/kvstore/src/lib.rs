//! # Replicated Key-Value Store
//!
//! Partitioned, eventually consistent string store built on the `actors`
//! runtime. Every partition actor holds a full replica; writes are resolved
//! last-writer-wins and spread by periodic delta gossip between local
//! partitions and across servers.
//!
//! ## Architecture
//!
//! ```text
//! client ──► FrontEnd(i) ──tell──► StoreActor(i) ──Gossip──► siblings
//!                ▲                      │        └─Gossip──► one member of
//!                └──── channel ref ◄────┘                    each remote server
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kv_config::ServerConfig;
//! use kvstore::Server;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let (first, descriptor) = Server::start(ServerConfig::new(6000, 2), &[]).await?;
//! let (second, _) = Server::start(ServerConfig::new(6100, 2), &[descriptor]).await?;
//! # Ok(())
//! # }
//! ```

pub mod frontend;
pub mod lww;
pub mod server;
pub mod store;

pub use frontend::FrontEnd;
pub use lww::{LwwMap, StoreEntry};
pub use server::{decode_descriptor, encode_descriptor, Server};
pub use store::{StoreActor, StoreMessage, StoreReply};
