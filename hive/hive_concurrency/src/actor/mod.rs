//! Actor-facing structures shared by every worker thread.
//!
//! This module provides the data the scheduler moves between threads:
//!
//! - Per-actor message queues that grow on demand
//! - The global ready list of queues with pending work
//! - The handle registry mapping handles and names to actor instances

pub mod mailbox;
pub mod ready;
pub mod registry;

// Re-export key types from mailbox
pub use mailbox::{MessageQueue, DEFAULT_QUEUE_SIZE, MQ_OVERLOAD};

// Re-export key types from ready
pub use ready::GlobalQueue;

// Re-export key types from registry
pub use registry::{HandleRegistry, Registrant, DEFAULT_SLOT_SIZE};
