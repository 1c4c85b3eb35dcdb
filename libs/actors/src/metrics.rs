//! Send Instrumentation
//!
//! System-wide counters are plain atomics bumped on the send path. Per-actor
//! send tables are written only by the owning actor but read by `stats()`
//! from arbitrary threads, so they sit behind a small lock.

use crate::reference::ActorRef;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Where a send originated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOrigin {
    /// `ActorSystem::tell` / `tell_after`
    External,
    /// `ActorContext::tell` / `tell_after`
    Actor,
    /// Forwarded from a remote runtime, already counted by the sender
    Remote,
}

/// Runtime-wide counters
#[derive(Debug, Default)]
pub struct SystemMetrics {
    messages_sent_external: AtomicU64,
    messages_sent_actor: AtomicU64,
    bytes_sent: AtomicU64,
    remote_bytes_received: AtomicU64,
    channel_refs_used: AtomicU64,
}

impl SystemMetrics {
    pub fn record_send(&self, origin: SendOrigin, bytes: usize) {
        let counter = match origin {
            SendOrigin::External => &self.messages_sent_external,
            SendOrigin::Actor => &self.messages_sent_actor,
            SendOrigin::Remote => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_remote_received(&self, bytes: usize) {
        self.remote_bytes_received
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_channel_used(&self) {
        self.channel_refs_used.fetch_add(1, Ordering::Relaxed);
    }

    /// Counter snapshot; `max_message_rate` is filled in by the caller
    pub fn snapshot(&self) -> Stats {
        let external = self.messages_sent_external.load(Ordering::Relaxed);
        let actor = self.messages_sent_actor.load(Ordering::Relaxed);
        Stats {
            messages_sent: external + actor,
            messages_sent_external: external,
            messages_sent_actor: actor,
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            remote_bytes_received: self.remote_bytes_received.load(Ordering::Relaxed),
            channel_refs_used: self.channel_refs_used.load(Ordering::Relaxed),
            max_message_rate: 0.0,
        }
    }
}

/// Receivers tracked per actor before single-message entries are folded
pub const MAX_TRACKED_RECEIVERS: usize = 1024;

#[derive(Debug, Default)]
struct SendTable {
    counts: HashMap<ActorRef, u64>,
    /// Receivers with one message were dropped from `counts`
    folded_singles: bool,
}

/// Per-actor count of messages sent to each receiver
///
/// Every reply channel is a distinct receiver that gets exactly one message,
/// so once the table passes `MAX_TRACKED_RECEIVERS` those entries are folded
/// away. All of them share the same rate, which is remembered instead. A
/// folded receiver that is sent to again restarts its count.
#[derive(Debug)]
pub struct SendStats {
    started: Instant,
    sends: Mutex<SendTable>,
}

impl SendStats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            sends: Mutex::new(SendTable::default()),
        }
    }

    pub fn record(&self, receiver: &ActorRef) {
        let mut table = self.sends.lock();
        match table.counts.get_mut(receiver) {
            Some(count) => *count += 1,
            None => {
                table.counts.insert(receiver.clone(), 1);
                if table.counts.len() > MAX_TRACKED_RECEIVERS {
                    table.counts.retain(|_, count| *count > 1);
                    table.folded_singles = true;
                }
            }
        }
    }

    pub fn count_for(&self, receiver: &ActorRef) -> u64 {
        self.sends.lock().counts.get(receiver).copied().unwrap_or(0)
    }

    /// Receivers currently tracked individually
    pub fn tracked_receivers(&self) -> usize {
        self.sends.lock().counts.len()
    }

    /// Highest messages/second towards any single receiver
    ///
    /// Alive time is rounded up with a little leeway, so a fresh actor that
    /// sends one message per tick is not penalised for its first partial
    /// second.
    pub fn max_rate(&self) -> f64 {
        let secs = (self.started.elapsed().as_secs_f64() + 1.1).floor();
        let table = self.sends.lock();
        let floor = if table.folded_singles { 1.0 / secs } else { 0.0 };
        table
            .counts
            .values()
            .map(|&count| count as f64 / secs)
            .fold(floor, f64::max)
    }
}

impl Default for SendStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot returned by `ActorSystem::stats`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Sent, not necessarily delivered
    pub messages_sent: u64,
    pub messages_sent_external: u64,
    pub messages_sent_actor: u64,
    /// Encoded payload bytes of every send
    pub bytes_sent: u64,
    /// Encoded payload bytes received from remote runtimes
    pub remote_bytes_received: u64,
    /// Response channels that were claimed by a message
    pub channel_refs_used: u64,
    /// Max messages/second for any actor→receiver pair
    pub max_message_rate: f64,
}
