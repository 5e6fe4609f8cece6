//! Node commands
//!
//! `run` starts a node from a configuration file; `check` validates one.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use hive_core::NodeConfig;
use hive_runtime::{services, system, ModuleRegistry};
use log::info;

/// Arguments for the run command
#[derive(Args)]
pub struct RunArgs {
    /// Path to the node configuration (TOML, or JSON with a .json extension)
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Override the number of worker threads
    #[clap(long)]
    pub threads: Option<usize>,

    /// Override the bootstrap service, as "<module> <args>"
    #[clap(long)]
    pub bootstrap: Option<String>,
}

/// Arguments for the check command
#[derive(Args)]
pub struct CheckArgs {
    /// Path to the node configuration
    pub file: PathBuf,
}

fn load(path: Option<&PathBuf>) -> Result<NodeConfig> {
    match path {
        Some(path) => NodeConfig::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display())),
        None => Ok(NodeConfig::default()),
    }
}

/// Implementation of the run command
pub fn execute_run(args: &RunArgs) -> Result<()> {
    let mut config = load(args.config.as_ref())?;
    if let Some(threads) = args.threads {
        config.thread = threads;
    }
    if let Some(bootstrap) = &args.bootstrap {
        config.bootstrap = bootstrap.clone();
    }

    let mut modules = ModuleRegistry::new();
    services::register_builtin(&mut modules).context("Failed to register built-in services")?;

    info!(
        "Starting node: {} workers, bootstrap \"{}\"",
        config.thread, config.bootstrap
    );
    system::run(config, modules)?;
    println!("node stopped");
    Ok(())
}

/// Implementation of the check command
pub fn execute_check(args: &CheckArgs) -> Result<()> {
    let config = load(Some(&args.file))?;
    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
    println!("{}", rendered);
    println!("configuration ok");
    Ok(())
}
