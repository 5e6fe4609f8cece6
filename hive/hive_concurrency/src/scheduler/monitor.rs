//! Per-worker watchdog record.
//!
//! A worker calls [`WorkerMonitor::trigger`] when it starts a dispatch
//! (with the real destination) and again when it finishes (with
//! [`Handle::NONE`]). A separate thread calls [`WorkerMonitor::check`]
//! periodically; an unchanged version with a live destination means the
//! worker has been inside one dispatch for a whole period.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use hive_core::Handle;

use crate::sync::VersionCounter;

/// A dispatch that made no progress over one check period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stall {
    /// Source of the message being processed
    pub source: Handle,
    /// Actor processing it
    pub destination: Handle,
    /// Version observed at both checks
    pub version: u64,
}

/// Watchdog record for one worker
#[derive(Debug, Default)]
pub struct WorkerMonitor {
    version: VersionCounter,
    check_version: AtomicU64,
    source: AtomicU32,
    destination: AtomicU32,
}

impl WorkerMonitor {
    /// Create an idle record
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the pair being dispatched and bump the version
    pub fn trigger(&self, source: Handle, destination: Handle) {
        self.source.store(source.raw(), Ordering::Relaxed);
        self.destination.store(destination.raw(), Ordering::Relaxed);
        self.version.increment();
    }

    /// Compare against the previous check.
    ///
    /// Returns the stalled pair if the version did not move and the worker
    /// is inside a dispatch; otherwise remembers the current version.
    pub fn check(&self) -> Option<Stall> {
        let version = self.version.get();
        if version != self.check_version.load(Ordering::Relaxed) {
            self.check_version.store(version, Ordering::Relaxed);
            return None;
        }

        let destination = Handle::new(self.destination.load(Ordering::Relaxed));
        if destination.is_none() {
            return None;
        }
        Some(Stall {
            source: Handle::new(self.source.load(Ordering::Relaxed)),
            destination,
            version,
        })
    }
}
