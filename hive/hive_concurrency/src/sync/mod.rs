//! Synchronization primitives with short hold times.
//!
//! - Atomic counters and flags for lifecycle accounting
//! - Busy-spin mutual exclusion and reader/writer locks for critical
//!   sections that last a handful of instructions

pub mod atomic;
pub mod lock;

// Re-export key types from atomic
pub use atomic::{AtomicCounter, AtomicFlag, SessionCounter, VersionCounter};

// Re-export key types from lock
pub use lock::{SpinLock, SpinLockGuard, SpinReadGuard, SpinRwLock, SpinWriteGuard};
