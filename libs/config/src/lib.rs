//! # Key-Value Store Configuration
//!
//! Settings for store servers and clients, with defaults for every value so a
//! bare `srunner` works without any file.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kv_config::KvConfig;
//! use std::path::Path;
//!
//! let config = KvConfig::load(Some(Path::new("config/kvstore.toml")))?;
//! let first_frontend = config.server.frontend_port(0);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod service;
pub mod service_config;

// Re-export commonly used types
pub use service_config::{
    load_config, ClientConfig, KvConfig, ServerConfig, TransportSettings,
};
