#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

//! # Hive Concurrency
//!
//! Scheduling substrate for the Hive actor node.
//!
//! This crate provides the lock-light structures the runtime is built on:
//!
//! - Short busy-spin locks and atomic counters
//! - Per-actor message queues and the global ready list
//! - The handle registry that names and owns actor instances
//! - Worker monitors (watchdog records) and worker parking
//!
//! ## Integration with Other Hive Crates
//!
//! - **hive_core**: handles and messages flowing through the queues
//! - **hive_runtime**: drives the dispatch loop over these structures

/// Message queues, the global ready list and the handle registry
pub mod actor;

/// Worker monitors and worker parking
pub mod scheduler;

/// Synchronization primitives with short hold times
pub mod sync;

// Re-export key types for easier access
pub use actor::mailbox::MessageQueue;
pub use actor::ready::GlobalQueue;
pub use actor::registry::{HandleRegistry, Registrant};
pub use scheduler::monitor::{Stall, WorkerMonitor};
pub use scheduler::park::WorkerPark;
