//! Configuration for a Hive node
//!
//! Handles loading and validating the node configuration.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::handle::HarborId;

/// Node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Number of worker threads
    #[serde(default = "default_thread")]
    pub thread: usize,

    /// Harbor (node id) embedded in every local handle
    #[serde(default)]
    pub harbor: u8,

    /// Bootstrap service, as `"<module> <args>"`
    #[serde(default = "default_bootstrap")]
    pub bootstrap: String,

    /// Log file for the logger service, `None` logs through the `log` facade
    #[serde(default)]
    pub logger: Option<String>,

    /// Module used for the logger service
    #[serde(default = "default_logservice")]
    pub logservice: String,

    /// Directory for per-actor message traces
    #[serde(default)]
    pub logpath: Option<String>,

    /// Watchdog period in milliseconds
    #[serde(default = "default_monitor_interval_ms")]
    pub monitor_interval_ms: u64,

    /// Clock tick in microseconds
    #[serde(default = "default_clock_interval_us")]
    pub clock_interval_us: u64,

    /// Initial environment
    #[serde(default)]
    pub env: HashMap<String, String>,
}

fn default_thread() -> usize {
    num_cpus::get()
}

fn default_bootstrap() -> String {
    "pingpong 100 abort".to_string()
}

fn default_logservice() -> String {
    "logger".to_string()
}

fn default_monitor_interval_ms() -> u64 {
    5000
}

fn default_clock_interval_us() -> u64 {
    2500
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            thread: default_thread(),
            harbor: 0,
            bootstrap: default_bootstrap(),
            logger: None,
            logservice: default_logservice(),
            logpath: None,
            monitor_interval_ms: default_monitor_interval_ms(),
            clock_interval_us: default_clock_interval_us(),
            env: HashMap::new(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from a file.
    ///
    /// Files ending in `.json` are parsed as JSON, everything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("Loading configuration from {}", path.display());

        let content = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let config = if is_json {
            Self::from_json(&content)?
        } else {
            Self::from_toml(&content)?
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thread == 0 {
            return Err(ConfigError::Invalid(
                "Thread count must be greater than zero".to_string(),
            ));
        }

        if self.bootstrap.split_whitespace().next().is_none() {
            return Err(ConfigError::Invalid(
                "Bootstrap service cannot be empty".to_string(),
            ));
        }

        if self.logservice.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "Logger service cannot be empty".to_string(),
            ));
        }

        if self.monitor_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "Monitor interval cannot be zero".to_string(),
            ));
        }

        if self.clock_interval_us == 0 {
            return Err(ConfigError::Invalid(
                "Clock interval cannot be zero".to_string(),
            ));
        }

        if self.thread > 256 {
            warn!("Running {} worker threads", self.thread);
        }

        Ok(())
    }

    /// Replace zero thread count and intervals with their defaults.
    ///
    /// `validate` rejects these; a node built from an unchecked config
    /// still must not spin on a zero interval.
    pub fn sanitized(mut self) -> Self {
        if self.thread == 0 {
            warn!("Thread count is zero, using {}", default_thread());
            self.thread = default_thread();
        }
        if self.monitor_interval_ms == 0 {
            warn!(
                "Monitor interval is zero, using {} ms",
                default_monitor_interval_ms()
            );
            self.monitor_interval_ms = default_monitor_interval_ms();
        }
        if self.clock_interval_us == 0 {
            warn!(
                "Clock interval is zero, using {} us",
                default_clock_interval_us()
            );
            self.clock_interval_us = default_clock_interval_us();
        }
        self
    }

    /// The harbor id as a typed value.
    pub fn harbor_id(&self) -> HarborId {
        HarborId::new(self.harbor)
    }

    /// Split `bootstrap` into module name and argument string.
    pub fn bootstrap_parts(&self) -> (&str, &str) {
        let trimmed = self.bootstrap.trim();
        match trimmed.split_once(char::is_whitespace) {
            Some((module, args)) => (module, args.trim()),
            None => (trimmed, ""),
        }
    }
}
