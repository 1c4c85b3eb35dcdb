//! Actor Context
//!
//! Handle given to every actor at construction. Sends made through it are
//! attributed to the actor: they count as actor sends and feed the per-pair
//! rate table.

use crate::metrics::{SendOrigin, SendStats};
use crate::reference::ActorRef;
use crate::system::ActorSystem;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct ActorContext {
    system: ActorSystem,
    self_ref: ActorRef,
    sends: Arc<SendStats>,
}

impl ActorContext {
    pub(crate) fn new(system: ActorSystem, self_ref: ActorRef, sends: Arc<SendStats>) -> Self {
        Self {
            system,
            self_ref,
            sends,
        }
    }

    /// Ref of the actor owning this context
    pub fn self_ref(&self) -> &ActorRef {
        &self.self_ref
    }

    /// Fire-and-forget send; never blocks
    pub fn tell<M: Serialize + ?Sized>(&self, target: &ActorRef, message: &M) {
        self.sends.record(target);
        self.system.send(target, message, SendOrigin::Actor);
    }

    /// Send after `delay`; cannot be cancelled
    pub fn tell_after<M: Serialize + ?Sized>(&self, target: &ActorRef, message: &M, delay: Duration) {
        self.sends.record(target);
        self.system
            .send_after(target, message, delay, SendOrigin::Actor);
    }

    pub fn is_local(&self, target: &ActorRef) -> bool {
        self.system.is_local(target)
    }

    /// Address of the runtime hosting this actor
    pub fn address(&self) -> &str {
        self.system.address()
    }

    pub fn system(&self) -> &ActorSystem {
        &self.system
    }
}
