//! Command-line client for the key-value store
//!
//! Usage:
//!   crunner --addr 127.0.0.1:6001 put topping cheese
//!   crunner --addr 127.0.0.1:6001 --addr 127.0.0.1:6002 get topping
//!   crunner --config config/kvstore.toml list cat/

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use kv_config::KvConfig;
use kvclient::{Client, RoundRobinRouter};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "crunner")]
#[command(about = "Key-value store client")]
#[command(version)]
struct Args {
    /// Front-end address; repeat to round robin between several
    #[arg(short, long)]
    addr: Vec<String>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the value stored under KEY
    Get { key: String },
    /// Store VALUE under KEY
    Put { key: String, value: String },
    /// Print every entry whose key starts with PREFIX
    List {
        #[arg(default_value = "")]
        prefix: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = KvConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    let addrs = if args.addr.is_empty() {
        config.client.addrs.clone()
    } else {
        args.addr.clone()
    };
    if addrs.is_empty() {
        bail!("no front-end address given (use --addr or client.addrs)");
    }
    debug!(?addrs, "Routing queries");

    let client = Client::new(RoundRobinRouter::new(addrs)?, &config.client);

    match args.command {
        Command::Get { key } => {
            let (value, found) = client.get(&key).await?;
            if found {
                println!("{}", value);
            } else {
                println!("(not found)");
            }
        }
        Command::Put { key, value } => {
            client.put(&key, &value).await?;
            println!("OK");
        }
        Command::List { prefix } => {
            for (key, value) in client.list(&prefix).await? {
                println!("{}\t{}", key, value);
            }
        }
    }

    Ok(())
}

fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
