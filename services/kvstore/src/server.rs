//! Store server bootstrap
//!
//! A server is one actor runtime listening on `base_port`, one partition
//! actor per configured partition, and one front end per partition on
//! `base_port + 1 ..= base_port + partitions`. Its descriptor (a JSON array
//! of its partition refs) is what later servers pass in to join.

use crate::frontend::FrontEnd;
use crate::store::{StoreActor, StoreMessage};
use actors::{ActorRef, ActorSystem, Stats, SystemConfig};
use anyhow::{Context, Result};
use kv_config::ServerConfig;
use network::TransportConfig;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

pub struct Server {
    system: ActorSystem,
    partitions: Vec<ActorRef>,
    frontend_addrs: Vec<String>,
    frontends: Mutex<Vec<JoinHandle<()>>>,
    shutdown: watch::Sender<bool>,
}

/// Encode partition refs as a server descriptor
pub fn encode_descriptor(partitions: &[ActorRef]) -> Result<String> {
    serde_json::to_string(partitions).context("Failed to encode server descriptor")
}

/// Decode a descriptor produced by `encode_descriptor`
pub fn decode_descriptor(descriptor: &str) -> Result<Vec<ActorRef>> {
    serde_json::from_str(descriptor)
        .with_context(|| format!("Invalid server descriptor: {}", descriptor))
}

impl Server {
    /// Start a server and join the servers described by `peers`
    ///
    /// Returns once the runtime, every partition and every front end are up,
    /// together with this server's own descriptor.
    pub async fn start(config: ServerConfig, peers: &[String]) -> Result<(Server, String)> {
        config.validate()?;
        let remote_groups = peers
            .iter()
            .map(|peer| decode_descriptor(peer))
            .collect::<Result<Vec<_>>>()?;

        let system_config = SystemConfig::new(config.host.clone(), config.base_port)
            .with_transport(TransportConfig::from(&config.transport));
        let system = ActorSystem::new(system_config)
            .await
            .context("Failed to start actor system")?;

        let gossip_interval = config.gossip_interval();
        let partitions: Vec<ActorRef> = (0..config.partitions)
            .map(|_| system.spawn(|ctx| StoreActor::new(ctx, gossip_interval)))
            .collect();

        for (index, partition) in partitions.iter().enumerate() {
            system.tell(
                partition,
                &StoreMessage::Init {
                    siblings: partitions.clone(),
                    remote_groups: remote_groups.clone(),
                    my_index: index,
                },
            );
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let mut frontends = Vec::with_capacity(partitions.len());
        let mut frontend_addrs = Vec::with_capacity(partitions.len());
        for (index, partition) in partitions.iter().enumerate() {
            let addr = format!("{}:{}", config.host, config.frontend_port(index));
            let front = FrontEnd::new(
                system.clone(),
                partition.clone(),
                config.query_timeout(),
                TransportConfig::from(&config.transport),
            );
            match front.bind(&addr, shutdown_rx.clone()).await {
                Ok(handle) => frontends.push(handle),
                Err(e) => {
                    let _ = shutdown.send(true);
                    system.close().await;
                    return Err(e);
                }
            }
            frontend_addrs.push(addr);
        }

        // Peers only learn about this server once it can serve
        for group in &remote_groups {
            for member in group {
                system.tell(
                    member,
                    &StoreMessage::NewPeerGroup {
                        refs: partitions.clone(),
                    },
                );
            }
        }

        let descriptor = encode_descriptor(&partitions)?;
        info!(
            address = %system.address(),
            partitions = partitions.len(),
            peers = remote_groups.len(),
            "Store server started"
        );

        let server = Server {
            system,
            partitions,
            frontend_addrs,
            frontends: Mutex::new(frontends),
            shutdown,
        };
        Ok((server, descriptor))
    }

    /// Runtime hosting the partitions
    pub fn system(&self) -> &ActorSystem {
        &self.system
    }

    pub fn stats(&self) -> Stats {
        self.system.stats()
    }

    pub fn partitions(&self) -> &[ActorRef] {
        &self.partitions
    }

    /// Client-facing addresses, indexed by partition
    pub fn frontend_addrs(&self) -> &[String] {
        &self.frontend_addrs
    }

    /// Stop the front ends, then the runtime
    pub async fn close(&self) {
        let _ = self.shutdown.send(true);
        let frontends = std::mem::take(&mut *self.frontends.lock());
        for handle in frontends {
            let _ = handle.await;
        }
        self.system.close().await;
        info!(address = %self.system.address(), "Store server closed");
    }
}
