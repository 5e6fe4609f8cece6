//! Node clock and pending timeouts.
//!
//! Time is counted in centiseconds since the node started. The clock thread
//! calls [`Timer::update`] on every tick and delivers the returned timeouts
//! as `Response` messages.

use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use hive_concurrency::sync::SpinLock;
use hive_core::Handle;

/// A timeout that came due
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout {
    /// Actor waiting for the timeout
    pub handle: Handle,
    /// Session the actor is waiting on
    pub session: i32,
}

#[derive(Debug, PartialEq, Eq)]
struct Entry {
    expire: u64,
    seq: u64,
    timeout: Timeout,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        (self.expire, self.seq).cmp(&(other.expire, other.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

#[derive(Default)]
struct Pending {
    heap: BinaryHeap<Reverse<Entry>>,
    seq: u64,
}

/// The node clock
pub struct Timer {
    started: Instant,
    start_time: i64,
    current: AtomicU64,
    pending: SpinLock<Pending>,
}

impl Timer {
    /// Start the clock now
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            start_time: chrono::Utc::now().timestamp(),
            current: AtomicU64::new(0),
            pending: SpinLock::new(Pending::default()),
        }
    }

    /// Centiseconds since start, as of the last update
    pub fn now(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }

    /// Wall-clock start time in seconds since the Unix epoch
    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    /// Schedule a timeout `ticks` centiseconds from now
    pub fn add(&self, handle: Handle, session: i32, ticks: u64) {
        let expire = self.now() + ticks;
        let mut pending = self.pending.lock();
        pending.seq += 1;
        let seq = pending.seq;
        pending.heap.push(Reverse(Entry {
            expire,
            seq,
            timeout: Timeout { handle, session },
        }));
    }

    /// Number of timeouts not yet due
    pub fn pending(&self) -> usize {
        self.pending.lock().heap.len()
    }

    /// Advance the clock and collect every timeout that came due, in
    /// expiry order.
    pub fn update(&self) -> Vec<Timeout> {
        let now = (self.started.elapsed().as_millis() / 10) as u64;
        self.current.fetch_max(now, Ordering::AcqRel);
        let now = self.now();

        let mut due = Vec::new();
        let mut pending = self.pending.lock();
        while pending
            .heap
            .peek()
            .is_some_and(|Reverse(entry)| entry.expire <= now)
        {
            if let Some(Reverse(entry)) = pending.heap.pop() {
                due.push(entry.timeout);
            }
        }
        due
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer")
            .field("now", &self.now())
            .field("start_time", &self.start_time)
            .finish()
    }
}
