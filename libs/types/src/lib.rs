//! # Key-Value Query Types
//!
//! Request/response messages exchanged between clients and a store server's
//! per-partition front ends. Each message travels bincode-encoded inside one
//! length-prefixed frame; one request frame is answered by exactly one
//! response frame.
//!
//! ```rust
//! use types::{QueryRequest, QueryResponse};
//!
//! let request = QueryRequest::put("topping", "cheese");
//! let bytes = request.to_bytes().unwrap();
//! assert_eq!(QueryRequest::from_bytes(&bytes).unwrap(), request);
//!
//! let miss = QueryResponse::Get { value: String::new(), found: false };
//! assert!(!miss.is_error());
//! ```

pub mod query;

pub use query::{QueryRequest, QueryResponse, WireError};
