//! Per-partition query front end
//!
//! Accepts client connections on the partition's port and turns each
//! `QueryRequest` frame into a message to the partition actor. Replies come
//! back through a fresh one-shot channel ref per request. Puts are answered
//! as soon as they are forwarded; gets and lists wait for the partition.
//! The front end holds no store state of its own.

use crate::store::{StoreMessage, StoreReply};
use actors::{ActorRef, ActorSystem};
use anyhow::{Context, Result};
use network::{TcpConnection, TransportConfig};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use types::{QueryRequest, QueryResponse};

/// Routes client queries to one partition actor
#[derive(Clone)]
pub struct FrontEnd {
    system: ActorSystem,
    partition: ActorRef,
    query_timeout: Duration,
    transport: TransportConfig,
}

impl FrontEnd {
    pub fn new(
        system: ActorSystem,
        partition: ActorRef,
        query_timeout: Duration,
        transport: TransportConfig,
    ) -> Self {
        Self {
            system,
            partition,
            query_timeout,
            transport,
        }
    }

    /// Bind `addr` and serve until `shutdown` flips
    pub async fn bind(
        self,
        addr: &str,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<JoinHandle<()>> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind front end on {}", addr))?;
        info!(addr = %addr, partition = %self.partition, "Front end listening");

        Ok(tokio::spawn(async move {
            loop {
                tokio::select! {
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => match TcpConnection::from_stream(stream, &self.transport) {
                            Ok(connection) => {
                                tokio::spawn(self.clone().serve(connection, shutdown.clone()));
                            }
                            Err(e) => warn!(peer = %peer, error = %e, "Failed to set up client connection"),
                        },
                        Err(e) => warn!(error = %e, "Client accept failed"),
                    },
                    _ = shutdown.changed() => break,
                }
            }
            debug!(partition = %self.partition, "Front end stopped");
        }))
    }

    /// Answer requests on one connection, in order
    async fn serve(self, connection: TcpConnection, mut shutdown: watch::Receiver<bool>) {
        let peer = connection.peer_addr();
        let (mut reader, mut writer) = connection.into_split();
        loop {
            let request = tokio::select! {
                request = reader.recv_value::<QueryRequest>() => request,
                _ = shutdown.changed() => break,
            };
            let request = match request {
                Ok(Some(request)) => request,
                Ok(None) => break,
                Err(e) => {
                    warn!(peer = %peer, error = %e, "Bad query frame");
                    break;
                }
            };

            let response = self.handle(request).await;
            if let Err(e) = writer.send_value(&response).await {
                debug!(peer = %peer, error = %e, "Client went away before the response");
                break;
            }
        }
    }

    /// Forward one request to the partition and build the client response
    pub async fn handle(&self, request: QueryRequest) -> QueryResponse {
        let (reply_to, reply) = self.system.new_channel_ref::<StoreReply>();
        match request {
            QueryRequest::Get { key } => {
                self.system
                    .tell(&self.partition, &StoreMessage::Get { key, reply_to });
                match reply.recv_timeout(self.query_timeout).await {
                    Some(StoreReply::Get { value, found }) => QueryResponse::Get { value, found },
                    other => self.failed("get", other),
                }
            }
            QueryRequest::Put { key, value } => {
                self.system.tell(
                    &self.partition,
                    &StoreMessage::Put {
                        key,
                        value,
                        reply_to,
                    },
                );
                reply.detach();
                QueryResponse::Put
            }
            QueryRequest::List { prefix } => {
                self.system
                    .tell(&self.partition, &StoreMessage::List { prefix, reply_to });
                match reply.recv_timeout(self.query_timeout).await {
                    Some(StoreReply::List { entries }) => QueryResponse::List { entries },
                    other => self.failed("list", other),
                }
            }
        }
    }

    fn failed(&self, op: &str, reply: Option<StoreReply>) -> QueryResponse {
        match reply {
            Some(other) => QueryResponse::error(format!("unexpected {} reply: {:?}", op, other)),
            None => {
                warn!(partition = %self.partition, op, "Partition did not reply in time");
                QueryResponse::error(format!(
                    "{} not answered within {}ms",
                    op,
                    self.query_timeout.as_millis()
                ))
            }
        }
    }
}
