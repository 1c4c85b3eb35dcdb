//! Service Configuration Module
//!
//! Loads store server and client settings from an optional TOML file, then
//! applies `KVSTORE_` environment overrides. Nested keys use a double
//! underscore, e.g. `KVSTORE_SERVER__BASE_PORT=7000`.

use crate::service::{client, server, transport};
use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use network::TransportConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Top-level configuration file layout
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct KvConfig {
    pub server: ServerConfig,
    pub client: ClientConfig,
}

/// Store server settings
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    /// Runtime listener; partition `i` serves clients on `base_port + 1 + i`
    pub base_port: u16,
    pub partitions: usize,
    pub gossip_interval_ms: u64,
    pub query_timeout_ms: u64,
    pub transport: TransportSettings,
}

/// Inter-server transport settings
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct TransportSettings {
    pub connect_timeout_ms: u64,
    pub max_frame_size: usize,
    /// Sender-side delay on every outbound frame; testing aid
    pub artificial_latency_ms: u64,
}

/// Client settings
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ClientConfig {
    /// Front-end addresses, used round robin
    pub addrs: Vec<String>,
    pub dial_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: server::DEFAULT_HOST.to_string(),
            base_port: server::DEFAULT_BASE_PORT,
            partitions: server::DEFAULT_PARTITIONS,
            gossip_interval_ms: server::GOSSIP_INTERVAL_MS,
            query_timeout_ms: server::QUERY_TIMEOUT_MS,
            transport: TransportSettings::default(),
        }
    }
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: transport::CONNECT_TIMEOUT_MS,
            max_frame_size: transport::MAX_FRAME_SIZE,
            artificial_latency_ms: 0,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            addrs: Vec::new(),
            dial_timeout_ms: client::DIAL_TIMEOUT_MS,
            request_timeout_ms: client::REQUEST_TIMEOUT_MS,
        }
    }
}

impl KvConfig {
    /// Load from an optional file with environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            info!("Loading config file: {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        // Override with environment variables (KVSTORE_ prefix)
        builder = builder.add_source(
            Environment::with_prefix("KVSTORE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;
        let config: KvConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.server.validate()?;
        debug!(?config, "Configuration loaded");
        Ok(config)
    }
}

impl ServerConfig {
    /// Defaults with a specific port layout
    pub fn new(base_port: u16, partitions: usize) -> Self {
        Self {
            base_port,
            partitions,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.partitions == 0 {
            bail!("server.partitions must be at least 1");
        }
        if usize::from(self.base_port) + self.partitions > usize::from(u16::MAX) {
            bail!(
                "server.base_port {} leaves no room for {} front-end ports",
                self.base_port,
                self.partitions
            );
        }
        if self.gossip_interval_ms == 0 {
            bail!("server.gossip_interval_ms must be positive");
        }
        Ok(())
    }

    /// Client-facing port of partition `index`
    pub fn frontend_port(&self, index: usize) -> u16 {
        // validate() keeps this in range
        self.base_port.saturating_add(1 + index as u16)
    }

    pub fn gossip_interval(&self) -> Duration {
        Duration::from_millis(self.gossip_interval_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

impl ClientConfig {
    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl From<&TransportSettings> for TransportConfig {
    fn from(settings: &TransportSettings) -> Self {
        TransportConfig {
            connect_timeout: Duration::from_millis(settings.connect_timeout_ms),
            max_frame_size: settings.max_frame_size,
            artificial_latency: Duration::from_millis(settings.artificial_latency_ms),
        }
    }
}

/// Convenience function to load configuration with defaults
pub fn load_config(path: Option<&Path>) -> Result<KvConfig> {
    KvConfig::load(path)
}
