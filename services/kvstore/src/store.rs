//! Partition store actor
//!
//! Each partition holds a full replica of the key space. Client writes are
//! stamped and merged locally, then spread by anti-entropy gossip: every tick
//! a partition sends the writes that changed its state since the last tick to
//! each local sibling and to one representative of every remote server.
//! Receivers merge with the same last-writer-wins rule and log whatever
//! changed their state, so updates keep flowing until every replica has them.

use crate::lww::{LwwMap, StoreEntry};
use actors::{ActorBehavior, ActorContext, ActorRef, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, trace};

/// Messages understood by a partition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StoreMessage {
    /// Topology handed over at server start; `siblings` includes the receiver
    Init {
        siblings: Vec<ActorRef>,
        remote_groups: Vec<Vec<ActorRef>>,
        my_index: usize,
    },
    Get {
        key: String,
        reply_to: ActorRef,
    },
    Put {
        key: String,
        value: String,
        reply_to: ActorRef,
    },
    List {
        prefix: String,
        reply_to: ActorRef,
    },
    /// Self-scheduled gossip round
    GossipTick,
    Gossip {
        entries: BTreeMap<String, StoreEntry>,
    },
    /// A server joined; `refs` are its partitions
    NewPeerGroup {
        refs: Vec<ActorRef>,
    },
}

/// Replies sent to the `reply_to` ref of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreReply {
    Get { value: String, found: bool },
    Put,
    List { entries: BTreeMap<String, String> },
}

pub struct StoreActor {
    ctx: ActorContext,
    store: LwwMap,
    /// Writes that changed local state since the last gossip round
    write_log: BTreeMap<String, StoreEntry>,
    siblings: Vec<ActorRef>,
    remote_groups: Vec<Vec<ActorRef>>,
    my_index: usize,
    gossip_interval: Duration,
    gossiping: bool,
}

impl StoreActor {
    pub fn new(ctx: ActorContext, gossip_interval: Duration) -> Self {
        Self {
            ctx,
            store: LwwMap::new(),
            write_log: BTreeMap::new(),
            siblings: Vec::new(),
            remote_groups: Vec::new(),
            my_index: 0,
            gossip_interval,
            gossiping: false,
        }
    }

    fn merge(&mut self, key: String, entry: StoreEntry) {
        if self.store.apply(&key, &entry) {
            self.write_log.insert(key, entry);
        }
    }

    /// The member of `group` this partition gossips to
    fn representative<'a>(&self, group: &'a [ActorRef]) -> Option<&'a ActorRef> {
        if group.is_empty() {
            None
        } else {
            group.get(self.my_index % group.len())
        }
    }

    fn gossip_round(&mut self) {
        if !self.write_log.is_empty() {
            let count = self.write_log.len();
            let message = StoreMessage::Gossip {
                entries: std::mem::take(&mut self.write_log),
            };
            let me = self.ctx.self_ref();
            let mut targets = 0;
            for sibling in self.siblings.iter().filter(|s| *s != me) {
                self.ctx.tell(sibling, &message);
                targets += 1;
            }
            for group in &self.remote_groups {
                if let Some(rep) = self.representative(group) {
                    self.ctx.tell(rep, &message);
                    targets += 1;
                }
            }
            debug!(actor = %me, entries = count, targets, "Gossip round");
        }

        self.ctx
            .tell_after(self.ctx.self_ref(), &StoreMessage::GossipTick, self.gossip_interval);
    }
}

#[async_trait]
impl ActorBehavior for StoreActor {
    type Message = StoreMessage;

    async fn handle(&mut self, msg: StoreMessage) -> Result<()> {
        match msg {
            StoreMessage::Init {
                siblings,
                remote_groups,
                my_index,
            } => {
                self.siblings = siblings;
                self.remote_groups = remote_groups;
                self.my_index = my_index;
                if !self.gossiping {
                    self.gossiping = true;
                    self.ctx.tell_after(
                        self.ctx.self_ref(),
                        &StoreMessage::GossipTick,
                        self.gossip_interval,
                    );
                }
                debug!(
                    actor = %self.ctx.self_ref(),
                    index = my_index,
                    siblings = self.siblings.len(),
                    remote_groups = self.remote_groups.len(),
                    "Partition initialised"
                );
            }
            StoreMessage::Get { key, reply_to } => {
                let reply = match self.store.get(&key) {
                    Some(entry) => StoreReply::Get {
                        value: entry.value.clone(),
                        found: true,
                    },
                    None => StoreReply::Get {
                        value: String::new(),
                        found: false,
                    },
                };
                self.ctx.tell(&reply_to, &reply);
            }
            StoreMessage::Put {
                key,
                value,
                reply_to,
            } => {
                let entry = StoreEntry::new(
                    value,
                    chrono::Utc::now().timestamp_millis(),
                    reply_to.uid(),
                );
                trace!(actor = %self.ctx.self_ref(), key = %key, "Put");
                self.merge(key, entry);
                self.ctx.tell(&reply_to, &StoreReply::Put);
            }
            StoreMessage::List { prefix, reply_to } => {
                let entries = self.store.list(&prefix);
                self.ctx.tell(&reply_to, &StoreReply::List { entries });
            }
            StoreMessage::GossipTick => self.gossip_round(),
            StoreMessage::Gossip { entries } => {
                for (key, entry) in entries {
                    self.merge(key, entry);
                }
            }
            StoreMessage::NewPeerGroup { refs } => {
                let snapshot = StoreMessage::Gossip {
                    entries: self.store.snapshot(),
                };
                for member in &refs {
                    self.ctx.tell(member, &snapshot);
                }
                debug!(
                    actor = %self.ctx.self_ref(),
                    members = refs.len(),
                    keys = self.store.len(),
                    "Sent snapshot to new peer group"
                );
                self.remote_groups.push(refs);
            }
        }
        Ok(())
    }
}
