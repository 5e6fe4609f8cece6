//! Error types for the Hive actor node.
//!
//! Errors are organized by subsystem. The root error type, `Error`, can
//! wrap any of the subsystem-specific errors, allowing for uniform error
//! handling at the top level.

use crate::handle::Handle;
use thiserror::Error;

/// Root error type for the Hive system.
#[derive(Debug, Error)]
pub enum Error {
    /// Handle registry errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Message delivery errors
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    /// Actor launch errors
    #[error("Launch error: {0}")]
    Launch(#[from] LaunchError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A service reported a failure from its own callback
    #[error("Service error: {0}")]
    Service(String),

    /// General runtime errors
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to the handle registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A name is already bound; names are never rebound
    #[error("Name already bound: {0}")]
    NameExists(String),
}

/// Errors raised while delivering a message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The destination was retired or never existed
    #[error("Unknown destination: {0}")]
    UnknownDestination(Handle),

    /// The destination name could not be resolved
    #[error("Unknown destination name: {0}")]
    UnknownName(String),

    /// The payload exceeds the maximum message size
    #[error("Message to {destination} is too large ({size} bytes)")]
    TooLarge {
        /// Intended destination
        destination: Handle,
        /// Rejected payload size
        size: usize,
    },
}

/// Errors raised while creating an actor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LaunchError {
    /// No module with this name was registered
    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    /// The module table is full
    #[error("Too many module types (limit {0})")]
    TooManyModules(usize),

    /// The module failed to create an instance
    #[error("Module {0} failed to create an instance: {1}")]
    InstanceFailed(String, String),

    /// The service's init routine failed
    #[error("Service {module} failed to initialize: {reason}")]
    InitFailed {
        /// Module name
        module: String,
        /// Failure reported by the service
        reason: String,
    },

    /// The service retired itself before init returned
    #[error("Service {0} exited during initialization")]
    ExitedDuringInit(Handle),
}

/// Errors related to configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration could not be parsed
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// The configuration is well-formed but invalid
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// The configuration file could not be read
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Hive operations.
pub type Result<T> = std::result::Result<T, Error>;
