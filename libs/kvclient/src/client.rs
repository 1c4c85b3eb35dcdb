//! Key-value client
//!
//! Every call dials the address chosen by the router, sends one request
//! frame and waits for one response frame. Calls are independent, so one
//! `Client` can be shared by concurrent tasks.

use crate::error::{ClientError, Result};
use crate::router::{FixedRouter, QueryRouter};
use kv_config::ClientConfig;
use network::{TcpConnection, TransportConfig};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use types::{QueryRequest, QueryResponse};

#[derive(Clone)]
pub struct Client {
    router: Arc<dyn QueryRouter>,
    transport: TransportConfig,
    request_timeout: Duration,
}

impl Client {
    pub fn new<R: QueryRouter + 'static>(router: R, config: &ClientConfig) -> Self {
        Self {
            router: Arc::new(router),
            transport: TransportConfig {
                connect_timeout: config.dial_timeout(),
                ..TransportConfig::default()
            },
            request_timeout: config.request_timeout(),
        }
    }

    /// Client bound to one front end with default settings
    pub fn connect_to(addr: impl Into<String>) -> Self {
        Self::new(FixedRouter::new(addr), &ClientConfig::default())
    }

    /// Value and whether the key exists
    pub async fn get(&self, key: &str) -> Result<(String, bool)> {
        match self.call(QueryRequest::get(key)).await? {
            QueryResponse::Get { value, found } => Ok((value, found)),
            other => Err(unexpected("get", other)),
        }
    }

    /// Store a value; success means the server accepted the request
    pub async fn put(&self, key: &str, value: &str) -> Result<()> {
        match self.call(QueryRequest::put(key, value)).await? {
            QueryResponse::Put => Ok(()),
            other => Err(unexpected("put", other)),
        }
    }

    /// Every entry whose key starts with `prefix`
    pub async fn list(&self, prefix: &str) -> Result<BTreeMap<String, String>> {
        match self.call(QueryRequest::list(prefix)).await? {
            QueryResponse::List { entries } => Ok(entries),
            other => Err(unexpected("list", other)),
        }
    }

    async fn call(&self, request: QueryRequest) -> Result<QueryResponse> {
        let addr = self.router.next_addr();
        debug!(addr = %addr, op = request.kind(), "Sending query");

        let connection = TcpConnection::connect(&addr, &self.transport)
            .await
            .map_err(|e| ClientError::transport(&addr, e))?;
        let (mut reader, mut writer) = connection.into_split();
        writer
            .send_value(&request)
            .await
            .map_err(|e| ClientError::transport(&addr, e))?;

        let response = tokio::time::timeout(self.request_timeout, reader.recv_value::<QueryResponse>())
            .await
            .map_err(|_| ClientError::Timeout {
                addr: addr.clone(),
                timeout_ms: self.request_timeout.as_millis() as u64,
            })?
            .map_err(|e| ClientError::transport(&addr, e))?;

        match response {
            Some(QueryResponse::Error { message }) => Err(ClientError::Server { message }),
            Some(response) => Ok(response),
            None => Err(ClientError::Closed { addr }),
        }
    }
}

fn unexpected(request: &'static str, response: QueryResponse) -> ClientError {
    ClientError::UnexpectedResponse {
        request,
        response: format!("{:?}", response),
    }
}
