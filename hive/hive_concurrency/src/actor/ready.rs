//! The global ready list.
//!
//! A FIFO of message queues believed to hold undispatched messages. The
//! list itself does not deduplicate: each queue's `in_global` flag
//! guarantees it is linked at most once.

use std::collections::VecDeque;
use std::sync::Arc;

use log::trace;

use super::mailbox::MessageQueue;
use crate::sync::SpinLock;

/// FIFO of queues with pending work
#[derive(Default)]
pub struct GlobalQueue {
    queues: SpinLock<VecDeque<Arc<MessageQueue>>>,
}

impl GlobalQueue {
    /// Create an empty ready list
    pub fn new() -> Self {
        Self::default()
    }

    /// Link a queue at the tail.
    pub fn push(&self, queue: Arc<MessageQueue>) {
        trace!("Ready list: link {}", queue.handle());
        self.queues.lock().push_back(queue);
    }

    /// Unlink the queue at the head.
    pub fn pop(&self) -> Option<Arc<MessageQueue>> {
        self.queues.lock().pop_front()
    }

    /// Number of linked queues
    pub fn len(&self) -> usize {
        self.queues.lock().len()
    }

    /// Whether no queue is linked
    pub fn is_empty(&self) -> bool {
        self.queues.lock().is_empty()
    }
}

impl std::fmt::Debug for GlobalQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalQueue")
            .field("len", &self.len())
            .finish()
    }
}
