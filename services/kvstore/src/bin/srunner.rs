//! Store server binary
//!
//! Usage:
//!   srunner --port 6000 --count 2
//!   srunner --port 6100 --count 4 --join '<descriptor printed by the first server>'
//!   srunner --config config/kvstore.toml

use anyhow::{Context, Result};
use clap::Parser;
use kv_config::KvConfig;
use kvstore::Server;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "srunner")]
#[command(about = "Replicated key-value store server")]
#[command(version)]
struct Args {
    /// Runtime port; front ends listen on the following ports
    #[arg(short, long)]
    port: Option<u16>,

    /// Number of partitions
    #[arg(short = 'n', long)]
    count: Option<usize>,

    /// Descriptor of an already running server; repeat for several
    #[arg(short, long)]
    join: Vec<String>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON logging format
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args);

    let config = KvConfig::load(args.config.as_deref()).map_err(|e| {
        error!("Failed to load configuration: {:#}", e);
        e
    })?;
    let mut server_config = config.server;
    if let Some(port) = args.port {
        server_config.base_port = port;
    }
    if let Some(count) = args.count {
        server_config.partitions = count;
    }

    let (server, descriptor) = Server::start(server_config, &args.join)
        .await
        .context("Failed to start store server")?;

    info!(frontends = ?server.frontend_addrs(), "Serving queries");
    println!("{}", descriptor);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to install CTRL+C signal handler")?;
    info!("Received shutdown signal");

    server.close().await;
    Ok(())
}

fn init_logging(args: &Args) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level));

    if args.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
