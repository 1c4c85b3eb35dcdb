//! Actor References
//!
//! An `ActorRef` names an actor (or a one-shot response channel) by the
//! address of the runtime that owns it plus a counter unique within that
//! runtime. Refs are plain values: they serialize, compare by value, and can be
//! sent to other runtimes inside messages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Location-transparent actor identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorRef {
    /// `host:port` of the owning runtime's inbound listener
    pub address: String,
    /// Unique within the owning runtime, never reused
    pub counter: i64,
}

impl ActorRef {
    /// Counter of refs handed out by a closed runtime
    pub const DEAD_COUNTER: i64 = -1;

    pub fn new(address: impl Into<String>, counter: i64) -> Self {
        Self {
            address: address.into(),
            counter,
        }
    }

    /// Permanently inert ref; messages to it are dropped
    pub fn dead(address: impl Into<String>) -> Self {
        Self::new(address, Self::DEAD_COUNTER)
    }

    pub fn is_dead(&self) -> bool {
        self.counter == Self::DEAD_COUNTER
    }

    /// Unique id string, used for tie-breaks
    pub fn uid(&self) -> String {
        format!("{}/{}", self.address, self.counter)
    }
}

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_equality_is_by_value() {
        let a = ActorRef::new("127.0.0.1:7000", 4);
        let b = ActorRef::new(String::from("127.0.0.1:7000"), 4);
        assert_eq!(a, b);
        assert_ne!(a, ActorRef::new("127.0.0.1:7001", 4));

        let mut counts = HashMap::new();
        *counts.entry(a).or_insert(0) += 1;
        *counts.entry(b).or_insert(0) += 1;
        assert_eq!(counts.len(), 1);
    }

    #[test]
    fn test_uid_and_display() {
        let r = ActorRef::new("127.0.0.1:7000", 12);
        assert_eq!(r.uid(), "127.0.0.1:7000/12");
        assert_eq!(r.to_string(), r.uid());
    }

    #[test]
    fn test_dead_ref() {
        let r = ActorRef::dead("127.0.0.1:7000");
        assert!(r.is_dead());
        assert!(!ActorRef::new("127.0.0.1:7000", 0).is_dead());
    }

    #[test]
    fn test_serde_round_trip() {
        let r = ActorRef::new("127.0.0.1:7000", 99);
        let bytes = bincode::serialize(&r).unwrap();
        let back: ActorRef = bincode::deserialize(&bytes).unwrap();
        assert_eq!(r, back);
    }
}
