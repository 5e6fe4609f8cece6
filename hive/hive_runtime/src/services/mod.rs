//! Services shipped with the runtime.

pub mod logger;
pub mod pingpong;

use hive_core::error::LaunchError;

use crate::module::ModuleRegistry;

pub use logger::Logger;
pub use pingpong::{PingPong, Pong};

/// Register `logger`, `pingpong` and `pong`
pub fn register_builtin(modules: &mut ModuleRegistry) -> Result<(), LaunchError> {
    modules.register_fn("logger", || Box::new(Logger::default()))?;
    modules.register_fn("pingpong", || Box::new(PingPong::default()))?;
    modules.register_fn("pong", || Box::new(Pong))?;
    Ok(())
}
