//! Shared helpers for the store integration tests

#![allow(dead_code)]

use kv_config::ServerConfig;
use kvclient::Client;
use kvstore::Server;
use std::future::Future;
use std::time::{Duration, Instant};

/// A running server plus one client per front end
pub struct TestServer {
    pub server: Server,
    pub descriptor: String,
    pub clients: Vec<Client>,
}

impl TestServer {
    pub fn client(&self, partition: usize) -> &Client {
        &self.clients[partition]
    }

    pub async fn close(&self) {
        self.server.close().await;
    }
}

pub async fn start(base_port: u16, partitions: usize, peers: &[String]) -> TestServer {
    start_with(ServerConfig::new(base_port, partitions), peers).await
}

/// Start a server whose runtime adds `latency_ms` to every remote send
pub async fn start_with_latency(
    base_port: u16,
    partitions: usize,
    peers: &[String],
    latency_ms: u64,
) -> TestServer {
    let mut config = ServerConfig::new(base_port, partitions);
    config.transport.artificial_latency_ms = latency_ms;
    start_with(config, peers).await
}

pub async fn start_with(config: ServerConfig, peers: &[String]) -> TestServer {
    let (server, descriptor) = Server::start(config, peers)
        .await
        .expect("server should start");
    let clients = server
        .frontend_addrs()
        .iter()
        .map(|addr| Client::connect_to(addr.clone()))
        .collect();
    TestServer {
        server,
        descriptor,
        clients,
    }
}

/// Poll `check` until it holds or `within` elapses
pub async fn eventually<F, Fut>(within: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + within;
    loop {
        if check().await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

/// Whether `client` sees `key` with exactly `value`
pub async fn sees(client: &Client, key: &str, value: &str) -> bool {
    matches!(client.get(key).await, Ok((v, true)) if v == value)
}
