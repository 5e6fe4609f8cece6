//! Services and helpers shared by the runtime integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use hive_core::{Error, Handle, Message, NodeConfig, Result};
use hive_runtime::{ModuleRegistry, Node, Service, ServiceContext};

pub const WAIT: Duration = Duration::from_secs(10);

/// A node config with fast clock and watchdog
pub fn test_config(threads: usize) -> NodeConfig {
    NodeConfig {
        thread: threads,
        monitor_interval_ms: 50,
        clock_interval_us: 1000,
        ..NodeConfig::default()
    }
}

/// Forwards every message it receives, tagged with its own handle
pub struct Recorder {
    pub tx: Sender<(Handle, Message)>,
}

impl Service for Recorder {
    fn init(&mut self, _ctx: &ServiceContext<'_>, _args: &str) -> Result<()> {
        Ok(())
    }

    fn dispatch(&mut self, ctx: &ServiceContext<'_>, message: Message) -> Result<()> {
        let _ = self.tx.send((ctx.handle(), message));
        Ok(())
    }
}

/// Counts messages and records any overlapping dispatch
pub struct Guard {
    pub busy: Arc<AtomicBool>,
    pub overlaps: Arc<AtomicUsize>,
    pub count: Arc<AtomicUsize>,
}

impl Service for Guard {
    fn init(&mut self, _ctx: &ServiceContext<'_>, _args: &str) -> Result<()> {
        Ok(())
    }

    fn dispatch(&mut self, _ctx: &ServiceContext<'_>, _message: Message) -> Result<()> {
        if self.busy.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        std::thread::yield_now();
        self.busy.store(false, Ordering::SeqCst);
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Reports entry, then blocks until released
pub struct Gated {
    pub entered: Sender<Handle>,
    pub release: Receiver<()>,
}

impl Service for Gated {
    fn init(&mut self, _ctx: &ServiceContext<'_>, _args: &str) -> Result<()> {
        Ok(())
    }

    fn dispatch(&mut self, ctx: &ServiceContext<'_>, _message: Message) -> Result<()> {
        let _ = self.entered.send(ctx.handle());
        let _ = self.release.recv_timeout(WAIT);
        Ok(())
    }
}

/// Init behaviour selected by the launch argument
pub struct Fragile;

impl Service for Fragile {
    fn init(&mut self, ctx: &ServiceContext<'_>, args: &str) -> Result<()> {
        match args {
            "fail" => Err(Error::Service("refusing to start".into())),
            "panic" => panic!("init exploded"),
            "exit" => {
                ctx.command("EXIT", "");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn dispatch(&mut self, _ctx: &ServiceContext<'_>, message: Message) -> Result<()> {
        match message.text_lossy().as_ref() {
            "bad" => Err(Error::Service("bad message".into())),
            "boom" => panic!("dispatch exploded"),
            _ => Ok(()),
        }
    }
}

/// Build a node with the recorder, fragile and built-in modules
pub fn recording_node(config: NodeConfig) -> (Arc<Node>, Receiver<(Handle, Message)>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let mut modules = ModuleRegistry::new();
    hive_runtime::services::register_builtin(&mut modules).unwrap();
    modules
        .register_fn("recorder", move || Box::new(Recorder { tx: tx.clone() }))
        .unwrap();
    modules.register_fn("fragile", || Box::new(Fragile)).unwrap();
    (Arc::new(Node::new(config, modules)), rx)
}
