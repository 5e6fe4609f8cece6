//! Scheduler threads.
//!
//! One monitor thread runs the watchdog, one clock thread advances time and
//! wakes idle workers, and a fixed number of workers run the dispatch loop.
//! Every thread stops once the node's live-actor total reaches zero.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use hive_concurrency::scheduler::default_weight;
use hive_concurrency::WorkerMonitor;
use hive_core::Handle;
use log::{debug, error, info, warn};

use crate::node::Node;

/// Running scheduler threads of a node
pub struct Scheduler {
    node: Arc<Node>,
    threads: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Spawn the monitor, clock and worker threads.
    ///
    /// # Panics
    ///
    /// Panics if a thread cannot be spawned.
    pub fn start(node: Arc<Node>) -> Self {
        let workers = node.park().workers();
        let monitors: Arc<Vec<WorkerMonitor>> =
            Arc::new((0..workers).map(|_| WorkerMonitor::new()).collect());
        let mut threads = Vec::with_capacity(workers + 2);

        info!("Starting scheduler with {} workers", workers);

        threads.push(spawn("hive-monitor", {
            let node = Arc::clone(&node);
            let monitors = Arc::clone(&monitors);
            move || monitor_loop(&node, &monitors)
        }));

        threads.push(spawn("hive-timer", {
            let node = Arc::clone(&node);
            move || clock_loop(&node)
        }));

        for id in 0..workers {
            let node = Arc::clone(&node);
            let monitors = Arc::clone(&monitors);
            threads.push(spawn(&format!("hive-worker-{}", id), move || {
                worker_loop(&node, &monitors[id], default_weight(id))
            }));
        }

        Self { node, threads }
    }

    /// Wait for every thread to stop, then release the harbor service
    pub fn join(self) {
        for handle in self.threads {
            let name = handle.thread().name().unwrap_or("hive").to_string();
            if handle.join().is_err() {
                error!("Thread {} panicked", name);
            }
        }
        self.node.harbor_exit();
        info!("Scheduler stopped");
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("threads", &self.threads.len())
            .finish()
    }
}

fn spawn<F>(name: &str, f: F) -> JoinHandle<()>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .expect("Failed to spawn scheduler thread")
}

fn monitor_loop(node: &Node, monitors: &[WorkerMonitor]) {
    let interval = Duration::from_millis(node.config().monitor_interval_ms);
    let step = interval.min(Duration::from_millis(100));

    loop {
        for stall in monitors.iter().filter_map(WorkerMonitor::check) {
            node.mark_endless(stall.destination);
            warn!(
                "{} may be in an endless loop handling a message from {}",
                stall.destination, stall.source
            );
            node.error(
                Handle::NONE,
                &format!(
                    "A message from [ {} ] to [ {} ] maybe in an endless loop (version = {})",
                    stall.source, stall.destination, stall.version
                ),
            );
        }

        let mut slept = Duration::ZERO;
        while slept < interval {
            if node.total() == 0 {
                debug!("Monitor thread exiting");
                return;
            }
            thread::sleep(step);
            slept += step;
        }
    }
}

fn clock_loop(node: &Node) {
    let tick = Duration::from_micros(node.config().clock_interval_us);
    let park = node.park();

    loop {
        node.update_time();
        if node.total() == 0 {
            break;
        }
        park.wakeup(park.workers() - 1);
        thread::sleep(tick);
    }

    debug!("Clock thread exiting");
    park.shutdown();
}

fn worker_loop(node: &Node, monitor: &WorkerMonitor, weight: i32) {
    let park = node.park();
    let mut queue = None;

    while !park.is_shutdown() {
        queue = node.dispatch(monitor, queue, weight);
        if queue.is_none() {
            park.park();
        }
    }
    debug!("Worker exiting");
}
