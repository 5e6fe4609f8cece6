//! Node bootstrap.

use std::sync::Arc;

use anyhow::{Context, Result};
use hive_core::NodeConfig;
use log::{info, warn};

use super::scheduler::Scheduler;
use crate::module::ModuleRegistry;
use crate::node::{Node, LOGGER_NAME};

/// Launch the logger service and the bootstrap service.
///
/// If the bootstrap service fails, whatever the logger received is flushed
/// on the calling thread before the error is returned.
pub fn bootstrap(node: &Node) -> Result<()> {
    let config = node.config();

    let logger = node
        .launch(&config.logservice, config.logger.as_deref().unwrap_or(""))
        .with_context(|| format!("Can't launch {} service", config.logservice))?;
    if !node.bind_name(logger, LOGGER_NAME) {
        warn!("Name {} already bound, {} is unnamed", LOGGER_NAME, logger);
    }

    let (module, args) = config.bootstrap_parts();
    if let Err(e) = node.launch(module, args) {
        node.dispatch_all(logger);
        return Err(e).with_context(|| format!("Bootstrap error: {}", config.bootstrap));
    }
    Ok(())
}

/// Build a node from `config`, bootstrap it, and run it until every actor
/// has exited.
pub fn run(config: NodeConfig, modules: ModuleRegistry) -> Result<()> {
    config.validate().context("Invalid node configuration")?;

    let node = Arc::new(Node::new(config, modules));
    bootstrap(&node)?;

    let scheduler = Scheduler::start(Arc::clone(&node));
    scheduler.join();
    info!("Node stopped with {} actors left", node.total());
    Ok(())
}
