//! Parking for idle workers.
//!
//! Workers that find the ready list empty sleep on a condition variable.
//! Producers and the clock thread call [`WorkerPark::wakeup`], which only
//! signals when enough workers sleep that a wakeup can find work.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use log::trace;
use parking_lot::{Condvar, Mutex};

/// Sleep/wake coordination for a fixed set of workers
#[derive(Debug)]
pub struct WorkerPark {
    workers: usize,
    sleepers: AtomicUsize,
    quit: AtomicBool,
    mutex: Mutex<()>,
    cond: Condvar,
}

impl WorkerPark {
    /// Create a park for `workers` worker threads
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            sleepers: AtomicUsize::new(0),
            quit: AtomicBool::new(false),
            mutex: Mutex::new(()),
            cond: Condvar::new(),
        }
    }

    /// Number of workers this park coordinates
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Number of workers currently asleep
    pub fn sleepers(&self) -> usize {
        self.sleepers.load(Ordering::Acquire)
    }

    /// Whether shutdown was requested
    pub fn is_shutdown(&self) -> bool {
        self.quit.load(Ordering::Acquire)
    }

    /// Block the calling worker until woken.
    ///
    /// Returns immediately once shutdown was requested. Wakeups may be
    /// spurious; callers re-check the ready list.
    pub fn park(&self) {
        let mut guard = self.mutex.lock();
        if self.quit.load(Ordering::Acquire) {
            return;
        }
        self.sleepers.fetch_add(1, Ordering::AcqRel);
        self.cond.wait(&mut guard);
        self.sleepers.fetch_sub(1, Ordering::AcqRel);
    }

    /// Wake one sleeper if at least `workers - busy` workers sleep
    pub fn wakeup(&self, busy: usize) -> bool {
        if self.sleepers() >= self.workers.saturating_sub(busy) {
            trace!("Waking a worker ({} asleep)", self.sleepers());
            let _guard = self.mutex.lock();
            self.cond.notify_one();
            return true;
        }
        false
    }

    /// Request shutdown and wake every sleeper
    pub fn shutdown(&self) {
        let _guard = self.mutex.lock();
        self.quit.store(true, Ordering::Release);
        self.cond.notify_all();
    }
}
