#![warn(rust_2018_idioms)]

//! # Hive Runtime
//!
//! Actor lifecycle and scheduling for a Hive node.
//!
//! A [`Node`] owns the handle registry, the global ready list and the
//! module table. Services are launched from registered [`Module`]s, talk to
//! each other through [`ServiceContext`], and are driven by the worker
//! threads of a [`Scheduler`].
//!
//! ```no_run
//! use hive_core::NodeConfig;
//! use hive_runtime::{services, system, ModuleRegistry};
//!
//! let mut modules = ModuleRegistry::new();
//! services::register_builtin(&mut modules).unwrap();
//! system::run(NodeConfig::default(), modules).unwrap();
//! ```

mod command;
pub mod context;
mod dispatch;
pub mod env;
pub mod harbor;
pub mod logfile;
pub mod module;
pub mod node;
pub mod services;
pub mod system;
pub mod timer;

pub use context::{ActorContext, ServiceContext};
pub use module::{FnModule, Module, ModuleRegistry, Service};
pub use node::{Node, LOGGER_NAME};
pub use system::Scheduler;
