//! Node startup and the scheduler threads.

pub mod bootstrap;
pub mod scheduler;

pub use bootstrap::{bootstrap, run};
pub use scheduler::Scheduler;
