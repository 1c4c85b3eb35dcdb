//! Query protocol messages

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Encoding failure for query messages
#[derive(Error, Debug)]
#[error("Query wire error: {0}")]
pub struct WireError(#[from] bincode::Error);

/// Client request to one partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryRequest {
    Get { key: String },
    Put { key: String, value: String },
    /// Every key starting with `prefix`; empty prefix lists everything
    List { prefix: String },
}

impl QueryRequest {
    pub fn get(key: impl Into<String>) -> Self {
        Self::Get { key: key.into() }
    }

    pub fn put(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn list(prefix: impl Into<String>) -> Self {
        Self::List {
            prefix: prefix.into(),
        }
    }

    /// Operation name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            QueryRequest::Get { .. } => "get",
            QueryRequest::Put { .. } => "put",
            QueryRequest::List { .. } => "list",
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, WireError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Front end answer to a `QueryRequest`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryResponse {
    /// Missing keys answer `found: false` with an empty value
    Get { value: String, found: bool },
    Put,
    List { entries: BTreeMap<String, String> },
    /// The server could not produce an answer (timeout, shutdown)
    Error { message: String },
}

impl QueryResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, QueryResponse::Error { .. })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, WireError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert_eq!(
            QueryRequest::get("k"),
            QueryRequest::Get { key: "k".into() }
        );
        assert_eq!(QueryRequest::list("cat/").kind(), "list");
        assert!(QueryResponse::error("timed out").is_error());
        assert!(!QueryResponse::Put.is_error());
    }

    #[test]
    fn test_list_entries_are_sorted() {
        let mut entries = BTreeMap::new();
        entries.insert("cat/tabby".to_string(), "b".to_string());
        entries.insert("cat/calico".to_string(), "a".to_string());
        let response = QueryResponse::List { entries };

        let back = QueryResponse::from_bytes(&response.to_bytes().unwrap()).unwrap();
        match back {
            QueryResponse::List { entries } => {
                let keys: Vec<_> = entries.keys().cloned().collect();
                assert_eq!(keys, vec!["cat/calico", "cat/tabby"]);
            }
            other => panic!("unexpected response {:?}", other),
        }
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(QueryRequest::from_bytes(&[0xff, 0xff, 0xff, 0xff]).is_err());
    }
}
