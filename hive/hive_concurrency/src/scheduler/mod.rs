//! Worker-side scheduling support.
//!
//! - Per-worker watchdog records
//! - Parking idle workers and waking them when work arrives
//! - The weight table that sets how many messages a worker drains per visit

pub mod monitor;
pub mod park;

// Re-export key types from monitor
pub use monitor::{Stall, WorkerMonitor};

// Re-export key types from park
pub use park::WorkerPark;

/// Weights for the first 32 workers.
///
/// A negative weight dispatches one message per visit; a weight `w >= 0`
/// dispatches `backlog >> w` messages (at least one).
const WEIGHTS: [i32; 32] = [
    -1, -1, -1, -1, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2, 2, 3, 3, 3, 3, 3, 3,
    3, 3,
];

/// Dispatch weight of worker `id`; workers past the table get weight 0
pub fn default_weight(id: usize) -> i32 {
    WEIGHTS.get(id).copied().unwrap_or(0)
}

/// Number of messages one visit dispatches for a given backlog and weight
pub fn batch_size(backlog: usize, weight: i32) -> usize {
    if weight < 0 {
        return 1;
    }
    (backlog >> weight).max(1)
}
