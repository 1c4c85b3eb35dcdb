//! Unbounded Mailbox
//!
//! Multi-producer, single-consumer FIFO. `push` never blocks and never fails;
//! `pop` waits until an item arrives or the mailbox is closed. Once closed,
//! queued items are discarded and every pop returns `None`.

use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::Notify;

struct MailboxState<T> {
    queue: VecDeque<T>,
    closed: bool,
}

/// Unbounded FIFO queue with close semantics
pub struct Mailbox<T> {
    state: Mutex<MailboxState<T>>,
    notify: Notify,
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MailboxState {
                queue: VecDeque::new(),
                closed: false,
            }),
            notify: Notify::new(),
        }
    }

    /// Append an item; silently dropped once closed
    pub fn push(&self, item: T) {
        {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.queue.push_back(item);
        }
        self.notify.notify_one();
    }

    /// Wait for the next item, `None` once closed
    pub async fn pop(&self) -> Option<T> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a push in between is not missed
            notified.as_mut().enable();

            {
                let mut state = self.state.lock();
                if state.closed {
                    return None;
                }
                if let Some(item) = state.queue.pop_front() {
                    return Some(item);
                }
            }

            notified.await;
        }
    }

    /// Non-blocking pop
    pub fn try_pop(&self) -> Option<T> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }
        state.queue.pop_front()
    }

    /// Close and discard pending items; idempotent
    pub fn close(&self) {
        let drained = {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            std::mem::take(&mut state.queue)
        };
        drop(drained);
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}
