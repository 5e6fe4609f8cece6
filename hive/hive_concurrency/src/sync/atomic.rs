//! Atomic operations and data structures.
//!
//! Provides lock-free counters and flags used for actor lifecycle
//! accounting and watchdog bookkeeping.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicIsize, AtomicU64, Ordering};

/// A signed counter that can be incremented and read atomically.
///
/// Signed so that keep-alive accounting may transiently push it below zero
/// during shutdown.
#[derive(Debug)]
pub struct AtomicCounter {
    /// The current value of the counter
    value: AtomicIsize,
}

impl AtomicCounter {
    /// Create a new atomic counter with an initial value.
    pub fn new(initial_value: isize) -> Self {
        Self {
            value: AtomicIsize::new(initial_value),
        }
    }

    /// Increment the counter and return the new value.
    pub fn increment(&self) -> isize {
        self.value.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Decrement the counter and return the new value.
    pub fn decrement(&self) -> isize {
        self.value.fetch_sub(1, Ordering::SeqCst) - 1
    }

    /// Get the current value of the counter.
    pub fn get(&self) -> isize {
        self.value.load(Ordering::SeqCst)
    }
}

impl Default for AtomicCounter {
    fn default() -> Self {
        Self::new(0)
    }
}

/// A flag that can be atomically set and unset.
#[derive(Debug)]
pub struct AtomicFlag {
    /// The flag value
    flag: AtomicBool,
}

impl AtomicFlag {
    /// Create a new atomic flag with the specified initial state.
    pub fn new(initial_state: bool) -> Self {
        Self {
            flag: AtomicBool::new(initial_state),
        }
    }

    /// Set the flag to true and return the previous value.
    pub fn set(&self) -> bool {
        self.flag.swap(true, Ordering::SeqCst)
    }

    /// Set the flag to false and return the previous value.
    pub fn unset(&self) -> bool {
        self.flag.swap(false, Ordering::SeqCst)
    }

    /// Get the current state of the flag.
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

}

impl Default for AtomicFlag {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Per-actor session allocator.
///
/// Sessions are strictly positive and increase monotonically, wrapping back
/// to 1 when the 31-bit range is exhausted.
#[derive(Debug, Default)]
pub struct SessionCounter {
    value: AtomicI32,
}

impl SessionCounter {
    /// Create a counter whose next session is `last + 1`.
    pub fn starting_after(last: i32) -> Self {
        Self {
            value: AtomicI32::new(last),
        }
    }

    /// Allocate the next session.
    pub fn next(&self) -> i32 {
        let mut current = self.value.load(Ordering::Relaxed);
        loop {
            let next = match current.checked_add(1) {
                Some(n) if n > 0 => n,
                _ => 1,
            };
            match self.value.compare_exchange_weak(
                current,
                next,
                Ordering::SeqCst,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }
}

/// A version counter for tracking progress.
///
/// Readers compare a snapshot against the current value to learn whether
/// the owner has moved on since the snapshot was taken.
#[derive(Debug)]
pub struct VersionCounter {
    /// The current version number
    version: AtomicU64,
}

impl VersionCounter {
    /// Create a new version counter starting at 0.
    pub fn new() -> Self {
        Self {
            version: AtomicU64::new(0),
        }
    }

    /// Increment the version number and return the new value.
    pub fn increment(&self) -> u64 {
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Get the current version number.
    pub fn get(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

}

impl Default for VersionCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_atomic_counter() {
        let counter = AtomicCounter::new(2);

        assert_eq!(counter.get(), 2);
        assert_eq!(counter.increment(), 3);
        assert_eq!(counter.decrement(), 2);
        assert_eq!(counter.decrement(), 1);
        assert_eq!(counter.decrement(), 0);
        assert_eq!(counter.decrement(), -1);
    }

    #[test]
    fn test_atomic_counter_threads() {
        let counter = Arc::new(AtomicCounter::new(0));
        let threads = 10;
        let increments_per_thread = 1000;

        let mut handles = vec![];

        for _ in 0..threads {
            let counter = Arc::clone(&counter);
            let handle = thread::spawn(move || {
                for _ in 0..increments_per_thread {
                    counter.increment();
                }
            });

            handles.push(handle);
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.get(), (threads * increments_per_thread) as isize);
    }

    #[test]
    fn test_atomic_flag() {
        let flag = AtomicFlag::new(false);

        assert!(!flag.is_set());
        assert!(!flag.set()); // Returns old value
        assert!(flag.is_set());
        assert!(flag.unset()); // Returns old value
        assert!(!flag.unset());
        assert!(!flag.is_set());
    }

    #[test]
    fn test_session_counter() {
        let sessions = SessionCounter::default();
        assert_eq!(sessions.next(), 1);
        assert_eq!(sessions.next(), 2);
        assert_eq!(sessions.next(), 3);
    }

    #[test]
    fn test_session_counter_wraps_to_one() {
        let sessions = SessionCounter::starting_after(i32::MAX - 1);
        assert_eq!(sessions.next(), i32::MAX);
        assert_eq!(sessions.next(), 1);
        assert_eq!(sessions.next(), 2);
    }
}
