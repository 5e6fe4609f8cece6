//! End-to-end runs of a bootstrapped node.

mod common;

use std::fs;
use std::sync::Arc;

use common::test_config;
use hive_core::NodeConfig;
use hive_runtime::{services, system, ModuleRegistry, Node, LOGGER_NAME};

fn builtin_modules() -> ModuleRegistry {
    let mut modules = ModuleRegistry::new();
    services::register_builtin(&mut modules).unwrap();
    modules
}

#[test]
fn test_pingpong_abort_stops_node() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("node.log");
    let config = NodeConfig {
        bootstrap: "pingpong 50 abort".to_string(),
        logger: Some(log.to_string_lossy().into_owned()),
        ..test_config(2)
    };

    system::run(config, builtin_modules()).unwrap();

    let content = fs::read_to_string(&log).unwrap();
    assert!(content.contains("LAUNCH pong"), "log was: {}", content);
}

#[test]
fn test_bootstrap_names_logger() {
    let config = NodeConfig {
        bootstrap: "pong".to_string(),
        ..test_config(1)
    };
    let node = Arc::new(Node::new(config, builtin_modules()));

    system::bootstrap(&node).unwrap();
    assert!(node.query_name(&format!(".{}", LOGGER_NAME)).is_some());
    assert_eq!(node.total(), 2);

    node.retire_all();
    assert_eq!(node.total(), 0);
}

#[test]
fn test_bootstrap_failure_flushes_logger() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("node.log");
    let config = NodeConfig {
        bootstrap: "missing".to_string(),
        logger: Some(log.to_string_lossy().into_owned()),
        ..test_config(1)
    };
    let node = Arc::new(Node::new(config, builtin_modules()));

    let err = system::bootstrap(&node).unwrap_err();
    assert!(format!("{:#}", err).contains("Bootstrap error: missing"));

    let content = fs::read_to_string(&log).unwrap();
    assert!(content.contains("FAILED launch missing"), "log was: {}", content);
}

#[test]
fn test_run_rejects_invalid_config() {
    let config = NodeConfig {
        thread: 0,
        ..NodeConfig::default()
    };
    let err = system::run(config, builtin_modules()).unwrap_err();
    assert!(format!("{:#}", err).contains("Invalid node configuration"));
}

#[test]
fn test_pingpong_exit_leaves_logger() {
    let config = NodeConfig {
        bootstrap: "pong".to_string(),
        ..test_config(2)
    };
    let node = Arc::new(Node::new(config, builtin_modules()));
    system::bootstrap(&node).unwrap();
    let pinger = node.launch("pingpong", "5").unwrap();

    let scheduler = hive_runtime::Scheduler::start(Arc::clone(&node));
    let deadline = std::time::Instant::now() + common::WAIT;
    while node.grab(pinger).is_some() {
        assert!(std::time::Instant::now() < deadline, "pingpong never finished");
        std::thread::sleep(std::time::Duration::from_millis(5));
    }

    // The logger and the bootstrap pong stay
    assert!(node.query_name(".logger").is_some());
    node.retire_all();
    scheduler.join();
    assert_eq!(node.total(), 0);
}
