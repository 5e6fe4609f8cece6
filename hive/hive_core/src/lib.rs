#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

//! # Hive Core
//!
//! `hive_core` provides the vocabulary shared by every Hive crate: actor
//! handles, the message envelope that travels through actor queues, the
//! error hierarchy, and the node configuration.
//!
//! ## Crate Structure
//!
//! - **handle**: 32-bit actor handles with the harbor (node id) in the high byte
//! - **message**: message envelope and type tags
//! - **error**: error types for all Hive components
//! - **config**: node configuration loaded from TOML or JSON

pub mod config;
pub mod error;
pub mod handle;
pub mod message;

// Re-export key types for convenience
pub use config::NodeConfig;
pub use error::{Error, Result};
pub use handle::{Handle, HarborId};
pub use message::{Message, MessageType};
