//! Front-end routing policies
//!
//! A router picks the front-end address used for each individual call. Any
//! `Fn() -> String` closure is also a router.

use crate::error::{ClientError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Supplies the address to contact for the next call
pub trait QueryRouter: Send + Sync {
    fn next_addr(&self) -> String;
}

impl<F> QueryRouter for F
where
    F: Fn() -> String + Send + Sync,
{
    fn next_addr(&self) -> String {
        self()
    }
}

/// Always the same front end
#[derive(Debug, Clone)]
pub struct FixedRouter {
    addr: String,
}

impl FixedRouter {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

impl QueryRouter for FixedRouter {
    fn next_addr(&self) -> String {
        self.addr.clone()
    }
}

/// Cycles through a fixed set of front ends
#[derive(Debug)]
pub struct RoundRobinRouter {
    addrs: Vec<String>,
    next: AtomicUsize,
}

impl RoundRobinRouter {
    pub fn new(addrs: Vec<String>) -> Result<Self> {
        if addrs.is_empty() {
            return Err(ClientError::NoAddresses);
        }
        Ok(Self {
            addrs,
            next: AtomicUsize::new(0),
        })
    }
}

impl QueryRouter for RoundRobinRouter {
    fn next_addr(&self) -> String {
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.addrs.len();
        self.addrs[i].clone()
    }
}
