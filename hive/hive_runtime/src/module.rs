//! Service modules.
//!
//! A [`Module`] is a named factory for [`Service`] instances. Modules are
//! registered ahead of time in a [`ModuleRegistry`] and looked up by name
//! whenever an actor is launched.

use std::fmt;
use std::sync::Arc;

use hive_core::error::LaunchError;
use hive_core::{Message, Result};
use log::debug;

use crate::context::ServiceContext;

/// Maximum number of distinct module types
pub const MAX_MODULE_TYPE: usize = 32;

/// The behaviour of one actor.
///
/// At most one worker calls into a service at any time, so methods take
/// `&mut self` and need no internal locking.
pub trait Service: Send {
    /// Initialize the instance. `args` is the launch argument string.
    ///
    /// The actor already has its handle, so init may bind names, start
    /// timers or launch other actors. An error aborts the launch.
    fn init(&mut self, ctx: &ServiceContext<'_>, args: &str) -> Result<()>;

    /// Handle one message. The message and its payload are owned by the
    /// callee.
    fn dispatch(&mut self, ctx: &ServiceContext<'_>, message: Message) -> Result<()>;

    /// Called once when the actor is torn down
    fn release(&mut self) {}
}

/// A named factory for services
pub trait Module: Send + Sync {
    /// Module name used by `launch`
    fn name(&self) -> &str;

    /// Create a fresh, uninitialized instance
    fn create(&self) -> Result<Box<dyn Service>>;
}

/// A module backed by a closure
pub struct FnModule<F> {
    name: String,
    create: F,
}

impl<F> FnModule<F>
where
    F: Fn() -> Box<dyn Service> + Send + Sync,
{
    /// Create a module named `name` that builds instances with `create`
    pub fn new(name: impl Into<String>, create: F) -> Self {
        Self {
            name: name.into(),
            create,
        }
    }
}

impl<F> Module for FnModule<F>
where
    F: Fn() -> Box<dyn Service> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn create(&self) -> Result<Box<dyn Service>> {
        Ok((self.create)())
    }
}

/// The table of known modules
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn Module>>,
}

impl ModuleRegistry {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module.
    ///
    /// Registering a name twice replaces the earlier module.
    pub fn register(&mut self, module: Arc<dyn Module>) -> std::result::Result<(), LaunchError> {
        if let Some(existing) = self.modules.iter_mut().find(|m| m.name() == module.name()) {
            *existing = module;
            return Ok(());
        }
        if self.modules.len() >= MAX_MODULE_TYPE {
            return Err(LaunchError::TooManyModules(MAX_MODULE_TYPE));
        }
        debug!("Registered module {}", module.name());
        self.modules.push(module);
        Ok(())
    }

    /// Register a closure-backed module
    pub fn register_fn<F>(&mut self, name: &str, create: F) -> std::result::Result<(), LaunchError>
    where
        F: Fn() -> Box<dyn Service> + Send + Sync + 'static,
    {
        self.register(Arc::new(FnModule::new(name, create)))
    }

    /// Look up a module by name
    pub fn query(&self, name: &str) -> Option<Arc<dyn Module>> {
        self.modules.iter().find(|m| m.name() == name).cloned()
    }

    /// Create an instance of the named module
    pub fn instantiate(&self, name: &str) -> std::result::Result<Box<dyn Service>, LaunchError> {
        let module = self
            .query(name)
            .ok_or_else(|| LaunchError::ModuleNotFound(name.to_string()))?;
        module
            .create()
            .map_err(|e| LaunchError::InstanceFailed(name.to_string(), e.to_string()))
    }

    /// Names of all registered modules
    pub fn names(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.name().to_string()).collect()
    }

    /// Number of registered modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.names())
            .finish()
    }
}
