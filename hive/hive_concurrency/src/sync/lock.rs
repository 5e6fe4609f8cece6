//! Busy-spin lock implementations.
//!
//! Every critical section in the scheduler is a few array or pointer
//! operations, far shorter than a scheduling quantum, so these locks spin
//! instead of parking the thread.

use std::cell::UnsafeCell;
use std::hint;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// A test-and-set spin lock.
pub struct SpinLock<T> {
    locked: AtomicBool,
    value: UnsafeCell<T>,
}

// SAFETY: access to `value` is serialized by `locked`.
unsafe impl<T: Send> Send for SpinLock<T> {}
// SAFETY: only one guard exists at a time, so `&SpinLock<T>` hands out
// `&mut T` to a single thread at a time.
unsafe impl<T: Send> Sync for SpinLock<T> {}

/// A guard for a `SpinLock`
pub struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
}

impl<T> SpinLock<T> {
    /// Create a new spin lock
    pub const fn new(value: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            value: UnsafeCell::new(value),
        }
    }

    /// Acquire the lock, spinning until it is free
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.locked.load(Ordering::Relaxed) {
                hint::spin_loop();
            }
        }
        SpinLockGuard { lock: self }
    }

    /// Try to acquire the lock without spinning
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| SpinLockGuard { lock: self })
    }

    /// Mutable access without locking, available through `&mut self`
    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }

    /// Consume the lock and return the value
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T: Default> Default for SpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Drop for SpinLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}

impl<T> Deref for SpinLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // SAFETY: the guard proves exclusive ownership of the lock.
        unsafe { &*self.lock.value.get() }
    }
}

impl<T> DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: the guard proves exclusive ownership of the lock.
        unsafe { &mut *self.lock.value.get() }
    }
}

/// A reader/writer spin lock built from a write-intent flag and a reader count.
///
/// A writer raises the flag first and then waits for readers to leave, so
/// new readers back off as soon as a writer is waiting. There is no
/// fairness guarantee between competing writers.
pub struct SpinRwLock<T> {
    write: AtomicBool,
    readers: AtomicUsize,
    value: UnsafeCell<T>,
}

// SAFETY: writers are exclusive; readers only get shared references.
unsafe impl<T: Send> Send for SpinRwLock<T> {}
// SAFETY: shared access requires `T: Sync`, exclusive access `T: Send`.
unsafe impl<T: Send + Sync> Sync for SpinRwLock<T> {}

/// A read guard for a `SpinRwLock`
pub struct SpinReadGuard<'a, T> {
    lock: &'a SpinRwLock<T>,
}

/// A write guard for a `SpinRwLock`
pub struct SpinWriteGuard<'a, T> {
    lock: &'a SpinRwLock<T>,
}

impl<T> SpinRwLock<T> {
    /// Create a new reader/writer spin lock
    pub const fn new(value: T) -> Self {
        Self {
            write: AtomicBool::new(false),
            readers: AtomicUsize::new(0),
            value: UnsafeCell::new(value),
        }
    }

    /// Acquire shared access
    pub fn read(&self) -> SpinReadGuard<'_, T> {
        loop {
            while self.write.load(Ordering::Acquire) {
                hint::spin_loop();
            }
            self.readers.fetch_add(1, Ordering::SeqCst);
            if self.write.load(Ordering::SeqCst) {
                self.readers.fetch_sub(1, Ordering::SeqCst);
            } else {
                return SpinReadGuard { lock: self };
            }
        }
    }

    /// Acquire exclusive access
    pub fn write(&self) -> SpinWriteGuard<'_, T> {
        while self
            .write
            .compare_exchange_weak(false, true, Ordering::SeqCst, Ordering::Relaxed)
            .is_err()
        {
            hint::spin_loop();
        }
        while self.readers.load(Ordering::SeqCst) != 0 {
            hint::spin_loop();
        }
        SpinWriteGuard { lock: self }
    }

    /// Mutable access without locking, available through `&mut self`
    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }
}

impl<T: Default> Default for SpinRwLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Drop for SpinReadGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.readers.fetch_sub(1, Ordering::Release);
    }
}

impl<T> Deref for SpinReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // SAFETY: no writer holds the lock while a reader is registered.
        unsafe { &*self.lock.value.get() }
    }
}

impl<T> Drop for SpinWriteGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.write.store(false, Ordering::Release);
    }
}

impl<T> Deref for SpinWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // SAFETY: the writer is exclusive.
        unsafe { &*self.lock.value.get() }
    }
}

impl<T> DerefMut for SpinWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: the writer is exclusive.
        unsafe { &mut *self.lock.value.get() }
    }
}
