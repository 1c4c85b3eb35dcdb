//! # Key-Value Store Client
//!
//! Talks to the per-partition front ends of store servers. Which front end a
//! call goes to is decided by a pluggable [`QueryRouter`].
//!
//! ```rust,no_run
//! use kvclient::{Client, RoundRobinRouter};
//! use kv_config::ClientConfig;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let router = RoundRobinRouter::new(vec![
//!     "127.0.0.1:6001".to_string(),
//!     "127.0.0.1:6002".to_string(),
//! ])?;
//! let client = Client::new(router, &ClientConfig::default());
//!
//! client.put("topping", "cheese").await?;
//! let (value, found) = client.get("topping").await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod router;

pub use client::Client;
pub use error::{ClientError, Result};
pub use router::{FixedRouter, QueryRouter, RoundRobinRouter};
