//! Actor Registry
//!
//! Instance-owned table resolving local counters to either an actor mailbox
//! or a one-shot response channel. Lookups happen on every local delivery, so
//! the table is a sharded `DashMap` rather than one lock around a `HashMap`.

use crate::error::Result;
use crate::mailbox::Mailbox;
use crate::messages::decode;
use crate::metrics::SendStats;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::oneshot;

/// Decodes a payload and completes a response channel
pub(crate) type DeliverFn = Box<dyn FnOnce(&[u8]) -> Result<()> + Send + Sync>;

pub(crate) enum RegistryEntry {
    Actor {
        mailbox: Arc<Mailbox<Vec<u8>>>,
        sends: Arc<SendStats>,
    },
    Channel(DeliverFn),
}

/// Result of resolving a local counter for delivery
pub(crate) enum Route {
    Actor(Arc<Mailbox<Vec<u8>>>),
    /// Claimed channel; the entry is already gone from the table
    Channel(DeliverFn),
    /// Channel was claimed concurrently by another sender
    ChannelReused,
    Missing,
}

type Entries = DashMap<i64, RegistryEntry>;

pub(crate) struct ActorRegistry {
    entries: Arc<Entries>,
    next_counter: AtomicI64,
}

impl ActorRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            next_counter: AtomicI64::new(0),
        }
    }

    /// Allocate a counter; counters are never reused
    pub(crate) fn next_counter(&self) -> i64 {
        self.next_counter.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn insert_actor(
        &self,
        counter: i64,
        mailbox: Arc<Mailbox<Vec<u8>>>,
        sends: Arc<SendStats>,
    ) {
        self.entries
            .insert(counter, RegistryEntry::Actor { mailbox, sends });
    }

    /// Register a one-shot channel under a fresh counter
    ///
    /// Dropping the receiver before the message arrives removes the entry,
    /// so abandoned requests do not pile up in the table.
    pub(crate) fn new_channel<M>(&self) -> (i64, ChannelReceiver<M>)
    where
        M: DeserializeOwned + Send + 'static,
    {
        let counter = self.next_counter();
        let (deliver, mut receiver) = ChannelReceiver::pair();
        self.entries.insert(counter, RegistryEntry::Channel(deliver));
        receiver.release = Some(ChannelRelease {
            entries: Arc::downgrade(&self.entries),
            counter,
        });
        (counter, receiver)
    }

    /// Resolve a counter, atomically claiming it if it is a channel
    pub(crate) fn route(&self, counter: i64) -> Route {
        {
            // Guard must be released before remove_if touches the same shard
            let Some(entry) = self.entries.get(&counter) else {
                return Route::Missing;
            };
            if let RegistryEntry::Actor { mailbox, .. } = entry.value() {
                return Route::Actor(mailbox.clone());
            }
        }

        match self
            .entries
            .remove_if(&counter, |_, entry| matches!(entry, RegistryEntry::Channel(_)))
        {
            Some((_, RegistryEntry::Channel(deliver))) => Route::Channel(deliver),
            _ => Route::ChannelReused,
        }
    }

    /// Highest per-pair send rate over all live actors
    pub(crate) fn max_message_rate(&self) -> f64 {
        self.entries
            .iter()
            .filter_map(|entry| match entry.value() {
                RegistryEntry::Actor { sends, .. } => Some(sends.max_rate()),
                RegistryEntry::Channel(_) => None,
            })
            .fold(0.0, f64::max)
    }

    /// Close every mailbox and drop pending channels
    ///
    /// Entries for actors stay in the table so their stats remain readable;
    /// closed mailboxes silently drop further pushes.
    pub(crate) fn close_all(&self) {
        self.entries
            .retain(|_, entry| match entry {
                RegistryEntry::Actor { mailbox, .. } => {
                    mailbox.close();
                    true
                }
                RegistryEntry::Channel(_) => false,
            });
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Removes an unclaimed channel entry when its receiver goes away
struct ChannelRelease {
    entries: Weak<Entries>,
    counter: i64,
}

impl Drop for ChannelRelease {
    fn drop(&mut self) {
        if let Some(entries) = self.entries.upgrade() {
            entries.remove_if(&self.counter, |_, entry| {
                matches!(entry, RegistryEntry::Channel(_))
            });
        }
    }
}

/// Receiving half of a one-shot response channel
///
/// Completes with `None` when the channel can never be fulfilled: the
/// runtime was closed, or the message sent to it failed to decode.
pub struct ChannelReceiver<M> {
    inner: Option<oneshot::Receiver<M>>,
    release: Option<ChannelRelease>,
}

impl<M: DeserializeOwned + Send + 'static> ChannelReceiver<M> {
    /// Create a channel slot plus the closure that fulfills it
    pub(crate) fn pair() -> (DeliverFn, Self) {
        let (tx, rx) = oneshot::channel::<M>();
        let deliver: DeliverFn = Box::new(move |payload: &[u8]| {
            let message = decode::<M>(payload)?;
            // Receiver may have given up waiting
            let _ = tx.send(message);
            Ok(())
        });
        (
            deliver,
            Self {
                inner: Some(rx),
                release: None,
            },
        )
    }
}

impl<M> ChannelReceiver<M> {
    /// Receiver that never yields a message
    pub(crate) fn closed() -> Self {
        Self {
            inner: None,
            release: None,
        }
    }

    /// Give up on the reply but keep the channel claimable
    ///
    /// For replies that will be sent but that nobody waits for; the entry is
    /// removed when the reply arrives or the runtime closes.
    pub fn detach(mut self) {
        if let Some(release) = self.release.as_mut() {
            release.entries = Weak::new();
        }
    }

    /// Wait for the single message
    pub async fn recv(self) -> Option<M> {
        // Held until the wait ends, however it ends
        let ChannelReceiver {
            inner,
            release: _release,
        } = self;
        match inner {
            Some(rx) => rx.await.ok(),
            None => None,
        }
    }

    /// Wait for the single message, giving up after `timeout`
    pub async fn recv_timeout(self, timeout: Duration) -> Option<M> {
        tokio::time::timeout(timeout, self.recv())
            .await
            .ok()
            .flatten()
    }
}
