//! Service defaults
//!
//! Default values used when no configuration file or environment override
//! provides a setting.

/// Store server defaults
pub mod server {
    /// Host the runtime and front ends bind to
    pub const DEFAULT_HOST: &str = "127.0.0.1";

    /// Runtime listener port; front ends use the ports right after it
    pub const DEFAULT_BASE_PORT: u16 = 6000;

    /// Partition actors (and front ends) per server
    pub const DEFAULT_PARTITIONS: usize = 1;

    /// Anti-entropy round interval (milliseconds)
    pub const GOSSIP_INTERVAL_MS: u64 = 100;

    /// How long a front end waits for a partition reply (milliseconds)
    pub const QUERY_TIMEOUT_MS: u64 = 5_000;
}

/// Inter-server transport defaults
pub mod transport {
    /// Dial timeout (milliseconds)
    pub const CONNECT_TIMEOUT_MS: u64 = 5_000;

    /// Largest accepted frame
    pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;
}

/// Client defaults
pub mod client {
    pub const DIAL_TIMEOUT_MS: u64 = 5_000;

    /// Covers the server-side query timeout plus transit
    pub const REQUEST_TIMEOUT_MS: u64 = 10_000;
}
