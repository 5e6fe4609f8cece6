//! Per-actor message queue.
//!
//! A circular buffer that doubles when it fills up and never shrinks. Each
//! queue carries an `in_global` flag recording whether it is linked in the
//! global ready list (or being dispatched); producers only link a queue
//! when they flip that flag, which keeps a queue from ever appearing in the
//! ready list twice.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use hive_core::{Handle, Message};
use log::trace;

use super::ready::GlobalQueue;
use crate::sync::SpinLock;

/// Initial ring capacity of a new queue
pub const DEFAULT_QUEUE_SIZE: usize = 64;

/// Base overload threshold; doubles each time the backlog exceeds it
pub const MQ_OVERLOAD: usize = 1024;

struct QueueState {
    slots: Vec<Option<Message>>,
    head: usize,
    tail: usize,
    in_global: bool,
    release: bool,
    overload: usize,
    overload_threshold: usize,
}

impl QueueState {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn len(&self) -> usize {
        if self.head <= self.tail {
            self.tail - self.head
        } else {
            self.tail + self.capacity() - self.head
        }
    }

    fn pop(&mut self) -> Option<Message> {
        if self.head == self.tail {
            // Drained: the next push must link the queue again
            self.overload_threshold = MQ_OVERLOAD;
            self.in_global = false;
            return None;
        }

        let backlog = self.len();
        let message = self.slots[self.head].take();
        self.head = (self.head + 1) % self.capacity();

        if backlog > self.overload_threshold {
            self.overload = backlog;
            self.overload_threshold *= 2;
        }

        message
    }

    fn expand(&mut self) {
        let cap = self.capacity();
        let mut slots: Vec<Option<Message>> = Vec::with_capacity(cap * 2);
        for i in 0..cap {
            slots.push(self.slots[(self.head + i) % cap].take());
        }
        slots.resize_with(cap * 2, || None);
        self.slots = slots;
        self.head = 0;
        self.tail = cap;
    }
}

/// The message queue owned by one actor
pub struct MessageQueue {
    handle: AtomicU32,
    state: SpinLock<QueueState>,
}

impl MessageQueue {
    /// Create a queue with the default capacity
    pub fn new(handle: Handle) -> Arc<Self> {
        Self::with_capacity(handle, DEFAULT_QUEUE_SIZE)
    }

    /// Create a queue with a specific initial capacity
    ///
    /// The queue starts flagged as linked so that its owner decides when it
    /// first enters the ready list, normally once the actor finished init.
    pub fn with_capacity(handle: Handle, capacity: usize) -> Arc<Self> {
        let capacity = capacity.max(1);
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);

        Arc::new(Self {
            handle: AtomicU32::new(handle.raw()),
            state: SpinLock::new(QueueState {
                slots,
                head: 0,
                tail: 0,
                in_global: true,
                release: false,
                overload: 0,
                overload_threshold: MQ_OVERLOAD,
            }),
        })
    }

    /// Handle of the owning actor
    pub fn handle(&self) -> Handle {
        Handle::new(self.handle.load(Ordering::Acquire))
    }

    /// Set the owner's handle once the registry assigned it
    pub fn assign_handle(&self, handle: Handle) {
        self.handle.store(handle.raw(), Ordering::Release);
    }

    /// Number of queued messages
    pub fn len(&self) -> usize {
        self.state.lock().len()
    }

    /// Whether the queue holds no message
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current ring capacity
    pub fn capacity(&self) -> usize {
        self.state.lock().capacity()
    }

    /// Whether the queue is linked in the ready list or being dispatched
    pub fn is_linked(&self) -> bool {
        self.state.lock().in_global
    }

    /// Current overload threshold
    pub fn overload_threshold(&self) -> usize {
        self.state.lock().overload_threshold
    }

    /// Push a message, linking the queue into `global` if it was idle.
    ///
    /// Returns true when this push linked the queue.
    pub fn push(self: &Arc<Self>, global: &GlobalQueue, message: Message) -> bool {
        let mut state = self.state.lock();

        let tail = state.tail;
        state.slots[tail] = Some(message);
        state.tail = (tail + 1) % state.capacity();
        if state.head == state.tail {
            state.expand();
            trace!("Queue {} grew to {}", self.handle(), state.capacity());
        }

        if state.in_global {
            return false;
        }
        state.in_global = true;
        global.push(Arc::clone(self));
        true
    }

    /// Pop the oldest message.
    ///
    /// Returns `None` and clears the linked flag when the queue is empty.
    pub fn pop(&self) -> Option<Message> {
        self.state.lock().pop()
    }

    /// Pop the oldest message, leaving the linked flag alone when empty.
    pub fn pop_if_any(&self) -> Option<Message> {
        let mut state = self.state.lock();
        if state.head == state.tail {
            return None;
        }
        state.pop()
    }

    /// Unlink the queue if it holds no message.
    ///
    /// Same as a `pop` that finds the queue empty, but never takes a
    /// message. Returns false, leaving the queue linked, if a push got in.
    pub fn unlink_if_empty(&self) -> bool {
        let mut state = self.state.lock();
        if state.head != state.tail {
            return false;
        }
        state.pop().is_none()
    }

    /// Read and clear the pending overload report, 0 if none.
    pub fn take_overload(&self) -> usize {
        std::mem::take(&mut self.state.lock().overload)
    }

    /// Mark the queue for release once its actor is gone.
    ///
    /// An unlinked queue is linked so a worker visits and drains it.
    pub fn mark_release(self: &Arc<Self>, global: &GlobalQueue) {
        let mut state = self.state.lock();
        debug_assert!(!state.release, "queue {} released twice", self.handle());
        state.release = true;
        if !state.in_global {
            state.in_global = true;
            global.push(Arc::clone(self));
        }
    }

    /// Release a queue visited after its actor vanished.
    ///
    /// If the queue was marked for release every remaining message is handed
    /// to `drop_fn` and `true` is returned; the storage goes away with the
    /// last reference. Otherwise the queue is linked again for a later visit.
    pub fn release<F>(self: &Arc<Self>, global: &GlobalQueue, mut drop_fn: F) -> bool
    where
        F: FnMut(Message),
    {
        {
            let state = self.state.lock();
            if !state.release {
                global.push(Arc::clone(self));
                return false;
            }
        }

        while let Some(message) = self.pop() {
            drop_fn(message);
        }
        true
    }
}

impl fmt::Debug for MessageQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MessageQueue")
            .field("handle", &self.handle())
            .field("len", &state.len())
            .field("capacity", &state.capacity())
            .field("in_global", &state.in_global)
            .field("release", &state.release)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_core::MessageType;
    use std::thread;

    fn message(seq: u32) -> Message {
        Message::new(
            Handle::new(seq),
            MessageType::User(9),
            seq as i32,
            seq.to_le_bytes().to_vec(),
        )
    }

    fn idle_queue(handle: u32, capacity: usize) -> Arc<MessageQueue> {
        let queue = MessageQueue::with_capacity(Handle::new(handle), capacity);
        // Consume the creation-time link the way an actor launch does
        assert!(queue.pop().is_none());
        queue
    }

    #[test]
    fn test_new_queue_is_held_out_of_ready_list() {
        let global = GlobalQueue::new();
        let queue = MessageQueue::new(Handle::new(1));

        assert!(queue.is_linked());
        assert!(!queue.push(&global, message(1)));
        assert!(global.is_empty());
    }

    #[test]
    fn test_push_links_once() {
        let global = GlobalQueue::new();
        let queue = idle_queue(1, 8);

        assert!(queue.push(&global, message(1)));
        assert!(!queue.push(&global, message(2)));
        assert!(!queue.push(&global, message(3)));
        assert_eq!(global.len(), 1);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_pop_fifo_and_relink() {
        let global = GlobalQueue::new();
        let queue = idle_queue(1, 8);

        for seq in 1..=3 {
            queue.push(&global, message(seq));
        }
        for seq in 1..=3 {
            assert_eq!(queue.pop().unwrap().session, seq);
        }

        assert!(queue.is_linked());
        assert!(queue.pop().is_none());
        assert!(!queue.is_linked());

        global.pop();
        assert!(queue.push(&global, message(4)));
        assert_eq!(global.len(), 1);
    }

    #[test]
    fn test_growth_preserves_messages() {
        let global = GlobalQueue::new();
        let capacity = 16;
        let queue = idle_queue(1, capacity);

        // Wrap the ring first so growth has to unroll a split buffer
        for seq in 0..5 {
            queue.push(&global, message(seq));
            queue.pop();
        }

        for seq in 0..=capacity as u32 {
            queue.push(&global, message(seq));
        }
        assert_eq!(queue.capacity(), capacity * 2);
        assert_eq!(queue.len(), capacity + 1);

        for seq in 0..=capacity as u32 {
            let popped = queue.pop().unwrap();
            assert_eq!(popped.session, seq as i32);
            assert_eq!(popped.payload, seq.to_le_bytes().to_vec());
        }
        assert!(queue.pop().is_none());
        assert_eq!(queue.capacity(), capacity * 2);
    }

    #[test]
    fn test_overload_threshold_doubles_and_resets() {
        let global = GlobalQueue::new();
        let queue = idle_queue(1, DEFAULT_QUEUE_SIZE);

        for seq in 0..(MQ_OVERLOAD as u32 + 1) {
            queue.push(&global, message(seq));
        }
        assert_eq!(queue.take_overload(), 0);

        queue.pop();
        assert_eq!(queue.take_overload(), MQ_OVERLOAD + 1);
        assert_eq!(queue.take_overload(), 0);
        assert_eq!(queue.overload_threshold(), MQ_OVERLOAD * 2);

        while queue.pop().is_some() {}
        assert_eq!(queue.overload_threshold(), MQ_OVERLOAD);

        for seq in 0..(MQ_OVERLOAD as u32 + 1) {
            queue.push(&global, message(seq));
        }
        queue.pop();
        assert_eq!(queue.take_overload(), MQ_OVERLOAD + 1);
    }

    #[test]
    fn test_overload_threshold_doubles_once_per_pop() {
        let global = GlobalQueue::new();
        let queue = idle_queue(1, DEFAULT_QUEUE_SIZE);

        for seq in 0..5000 {
            queue.push(&global, message(seq));
        }

        queue.pop();
        assert_eq!(queue.take_overload(), 5000);
        assert_eq!(queue.overload_threshold(), MQ_OVERLOAD * 2);

        // Still above the raised threshold: reported again
        queue.pop();
        assert_eq!(queue.take_overload(), 4999);
        assert_eq!(queue.overload_threshold(), MQ_OVERLOAD * 4);

        queue.pop();
        assert_eq!(queue.take_overload(), 4998);
        assert_eq!(queue.overload_threshold(), MQ_OVERLOAD * 8);

        queue.pop();
        assert_eq!(queue.take_overload(), 0);
        assert_eq!(queue.overload_threshold(), MQ_OVERLOAD * 8);
    }

    #[test]
    fn test_unlink_if_empty() {
        let global = GlobalQueue::new();
        let queue = idle_queue(3, 4);

        assert!(queue.push(&global, message(1)));
        assert!(!queue.unlink_if_empty());
        assert!(queue.is_linked());
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.pop_if_any().map(|m| m.session), Some(1));
        assert!(queue.pop_if_any().is_none());
        assert!(queue.is_linked());
        assert!(queue.unlink_if_empty());
        assert!(!queue.is_linked());
        // The next push links it again
        assert!(queue.push(&global, message(2)));
    }

    #[test]
    fn test_mark_release_links_idle_queue() {
        let global = GlobalQueue::new();
        let queue = idle_queue(7, 4);

        queue.mark_release(&global);
        assert_eq!(global.len(), 1);
        assert!(Arc::ptr_eq(&global.pop().unwrap(), &queue));
    }

    #[test]
    fn test_mark_release_does_not_relink() {
        let global = GlobalQueue::new();
        let queue = idle_queue(7, 4);

        queue.push(&global, message(1));
        queue.mark_release(&global);
        assert_eq!(global.len(), 1);
    }

    #[test]
    fn test_release_drains_marked_queue() {
        let global = GlobalQueue::new();
        let queue = idle_queue(7, 4);
        for seq in 1..=5 {
            queue.push(&global, message(seq));
        }
        global.pop();
        queue.mark_release(&global);

        let mut dropped = Vec::new();
        assert!(queue.release(&global, |m| dropped.push(m.session)));
        assert_eq!(dropped, vec![1, 2, 3, 4, 5]);
        assert!(queue.is_empty());
        assert!(global.is_empty());
    }

    #[test]
    fn test_release_unmarked_relinks() {
        let global = GlobalQueue::new();
        let queue = idle_queue(7, 4);
        queue.push(&global, message(1));
        global.pop();

        assert!(!queue.release(&global, |_| panic!("nothing to drop")));
        assert_eq!(global.len(), 1);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_concurrent_producers_link_once() {
        let global = Arc::new(GlobalQueue::new());
        let queue = idle_queue(1, 4);
        let mut handles = vec![];

        for producer in 0..4u32 {
            let global = Arc::clone(&global);
            let queue = Arc::clone(&queue);
            handles.push(thread::spawn(move || {
                for seq in 0..500u32 {
                    queue.push(&global, message(producer * 1000 + seq));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(global.len(), 1);
        assert_eq!(queue.len(), 2000);

        // Per producer, messages come out in push order
        let mut last = [None::<i32>; 4];
        while let Some(m) = queue.pop() {
            let producer = (m.session / 1000) as usize;
            if let Some(prev) = last[producer] {
                assert!(m.session > prev);
            }
            last[producer] = Some(m.session);
        }
    }
}
