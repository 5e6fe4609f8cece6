//! The node: every actor, queue and shared table of one process.
//!
//! A [`Node`] is constructed explicitly and shared through `Arc` by the
//! scheduler threads. Services reach it through their
//! [`ServiceContext`](crate::context::ServiceContext).

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use hive_concurrency::sync::{AtomicCounter, SpinLock};
use hive_concurrency::{GlobalQueue, HandleRegistry, WorkerPark};
use hive_core::error::{DeliveryError, LaunchError};
use hive_core::message::MESSAGE_SIZE_MAX;
use hive_core::{Error, Handle, HarborId, Message, MessageType, NodeConfig};
use log::{debug, info, warn};

use crate::context::{ActorContext, ServiceContext};
use crate::env::Env;
use crate::harbor::{self, RemoteTarget};
use crate::module::ModuleRegistry;
use crate::timer::Timer;

/// Name the logging service is registered under
pub const LOGGER_NAME: &str = "logger";

/// One actor node
pub struct Node {
    config: NodeConfig,
    harbor: HarborId,
    registry: HandleRegistry<ActorContext>,
    global: Arc<GlobalQueue>,
    total: Arc<AtomicCounter>,
    modules: ModuleRegistry,
    park: Arc<WorkerPark>,
    timer: Timer,
    env: Env,
    remote: SpinLock<Option<Arc<ActorContext>>>,
    monitor_exit: AtomicU32,
}

impl Node {
    /// Create a node with no actors
    pub fn new(config: NodeConfig, modules: ModuleRegistry) -> Self {
        let config = config.sanitized();
        let harbor = config.harbor_id();
        let workers = config.thread;
        let env = Env::new(config.env.clone());
        info!(
            "Creating node (harbor {}, {} workers, {} modules)",
            harbor.get(),
            workers,
            modules.len()
        );

        Self {
            harbor,
            registry: HandleRegistry::new(harbor),
            global: Arc::new(GlobalQueue::new()),
            total: Arc::new(AtomicCounter::new(0)),
            modules,
            park: Arc::new(WorkerPark::new(workers)),
            timer: Timer::new(),
            env,
            remote: SpinLock::new(None),
            monitor_exit: AtomicU32::new(0),
            config,
        }
    }

    /// The configuration the node was built from
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Harbor id of this node
    pub fn harbor(&self) -> HarborId {
        self.harbor
    }

    /// Number of live actors, not counting reserved ones
    pub fn total(&self) -> isize {
        self.total.get()
    }

    /// The global ready list
    pub fn global(&self) -> &Arc<GlobalQueue> {
        &self.global
    }

    /// Worker parking shared with the scheduler
    pub fn park(&self) -> &Arc<WorkerPark> {
        &self.park
    }

    /// The node clock
    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    /// Node environment
    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Registered modules
    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    pub(crate) fn logpath(&self) -> Option<&Path> {
        self.config.logpath.as_deref().map(Path::new)
    }

    /// Launch an actor of `module` with argument string `args`.
    ///
    /// The actor is registered before its init runs; its queue only joins
    /// the ready list once init succeeded, so nothing is dispatched to a
    /// half-initialized actor.
    pub fn launch(&self, module: &str, args: &str) -> Result<Handle, LaunchError> {
        let instance = match self.modules.instantiate(module) {
            Ok(instance) => instance,
            Err(e) => {
                self.error(Handle::NONE, &format!("FAILED launch {}: {}", module, e));
                return Err(e);
            }
        };

        let ctx = Arc::new(ActorContext::new(
            module,
            instance,
            Arc::clone(&self.global),
            Arc::clone(&self.total),
        ));
        let handle = self.registry.register(Arc::clone(&ctx));
        let queue = Arc::clone(ctx.queue());

        let result = match ctx.try_instance() {
            Some(mut instance) => {
                let service_ctx = ServiceContext::new(self, &ctx);
                panic::catch_unwind(AssertUnwindSafe(|| instance.init(&service_ctx, args)))
            }
            None => Ok(Err(Error::Runtime(format!("{} claimed before init", handle)))),
        };

        let reason = match result {
            Ok(Ok(())) => {
                ctx.mark_initialized();
                drop(ctx);
                let alive = self.registry.grab(handle).is_some();
                // The queue was held out of the ready list since creation
                self.global.push(queue);
                if !alive {
                    debug!("{} exited during init", handle);
                    return Err(LaunchError::ExitedDuringInit(handle));
                }
                let line = format!("LAUNCH {} {}", module, args);
                self.error(handle, line.trim_end());
                return Ok(handle);
            }
            Ok(Err(e)) => e.to_string(),
            Err(panic) => format!("init panicked: {}", panic_message(panic.as_ref())),
        };

        self.error(handle, &format!("FAILED launch {}: {}", module, reason));
        drop(ctx);
        self.registry.retire(handle);
        queue.release(&self.global, |message| self.drop_message(handle, message));
        Err(LaunchError::InitFailed {
            module: module.to_string(),
            reason,
        })
    }

    /// Take a reference to a live actor
    pub fn grab(&self, handle: Handle) -> Option<Arc<ActorContext>> {
        self.registry.grab(handle)
    }

    /// Push a message into the queue of `handle`.
    ///
    /// On failure the message is handed back; the caller decides how to
    /// dispose of it and whether to notify the sender.
    pub fn push_message(&self, handle: Handle, message: Message) -> Result<(), Message> {
        let Some(ctx) = self.registry.grab(handle) else {
            return Err(message);
        };
        if ctx.queue().push(&self.global, message) {
            self.park.wakeup(0);
        }
        Ok(())
    }

    /// Send a message.
    ///
    /// `source` defaults to the sending actor when `Handle::NONE`. A
    /// `destination` of `Handle::NONE` only returns the session. Returns
    /// the session on success. A failed delivery posts one `Error` message
    /// back to the source.
    pub fn send(
        &self,
        ctx: &ActorContext,
        source: Handle,
        destination: Handle,
        kind: MessageType,
        session: i32,
        payload: Vec<u8>,
    ) -> Result<i32, DeliveryError> {
        let source = if source.is_none() { ctx.handle() } else { source };

        if payload.len() >= MESSAGE_SIZE_MAX {
            self.error(
                source,
                &format!("The message to {} is too large ({} bytes)", destination, payload.len()),
            );
            return Err(DeliveryError::TooLarge {
                destination,
                size: payload.len(),
            });
        }

        if destination.is_none() {
            if !payload.is_empty() {
                self.error(source, "Destination address can't be 0");
                return Err(DeliveryError::UnknownDestination(destination));
            }
            return Ok(session);
        }

        let message = Message::new(source, kind, session, payload);
        if destination.is_remote(self.harbor) {
            return self
                .forward(destination, RemoteTarget::Handle(destination), message)
                .map(|_| session);
        }

        match self.push_message(destination, message) {
            Ok(()) => Ok(session),
            Err(message) => {
                self.report_undeliverable(destination, &message);
                Err(DeliveryError::UnknownDestination(destination))
            }
        }
    }

    /// Send with a freshly allocated session of the sending actor
    pub fn call(
        &self,
        ctx: &ActorContext,
        source: Handle,
        destination: Handle,
        kind: MessageType,
        payload: Vec<u8>,
    ) -> Result<i32, DeliveryError> {
        let session = ctx.new_session();
        self.send(ctx, source, destination, kind, session, payload)
    }

    /// Send to an address: `:hex` handle, `.name` local name, or a bare
    /// global name forwarded to the harbor service
    pub fn send_name(
        &self,
        ctx: &ActorContext,
        source: Handle,
        address: &str,
        kind: MessageType,
        session: i32,
        payload: Vec<u8>,
    ) -> Result<i32, DeliveryError> {
        if address.starts_with(':') || address.starts_with('.') {
            let Some(destination) = self.query_name(address) else {
                return Err(DeliveryError::UnknownName(address.to_string()));
            };
            return self.send(ctx, source, destination, kind, session, payload);
        }

        let source = if source.is_none() { ctx.handle() } else { source };
        let message = Message::new(source, kind, session, payload);
        self.forward(Handle::NONE, RemoteTarget::Name(address.to_string()), message)
            .map(|_| session)
    }

    /// Resolve `:hex` to a handle or `.name` through the name table
    pub fn query_name(&self, name: &str) -> Option<Handle> {
        if name.starts_with(':') {
            return name.parse().ok();
        }
        name.strip_prefix('.')
            .and_then(|local| self.registry.find_by_name(local))
    }

    /// Bind a local name to a handle
    pub fn bind_name(&self, handle: Handle, name: &str) -> bool {
        self.registry.bind_name(handle, name).is_ok()
    }

    /// Report a diagnostic through the logger service.
    ///
    /// Falls back to the `log` facade when no logger is registered.
    pub fn error(&self, source: Handle, text: &str) {
        if let Some(logger) = self.registry.find_by_name(LOGGER_NAME) {
            if self.push_message(logger, Message::text(source, text)).is_ok() {
                return;
            }
        }
        warn!("[{}] {}", source, text);
    }

    /// Retire a handle; false if it was not live
    pub fn retire(&self, handle: Handle) -> bool {
        self.registry.retire(handle)
    }

    /// Retire every actor
    pub fn retire_all(&self) {
        self.registry.retire_all();
    }

    /// Handles of every live actor
    pub fn handles(&self) -> Vec<Handle> {
        self.registry.handles()
    }

    /// Grab an actor without counting it toward the live total.
    ///
    /// The node finishes when the total reaches zero, so a reserved actor
    /// keeps running without holding the node alive.
    pub fn reserve(&self, handle: Handle) -> Option<Arc<ActorContext>> {
        let ctx = self.registry.grab(handle)?;
        self.total.decrement();
        Some(ctx)
    }

    /// Install `handle` as the harbor service that receives remote traffic
    pub fn start_harbor(&self, handle: Handle) -> bool {
        match self.reserve(handle) {
            Some(ctx) => {
                info!("Harbor service is {}", handle);
                *self.remote.lock() = Some(ctx);
                true
            }
            None => false,
        }
    }

    /// Drop the reserved harbor service
    pub fn harbor_exit(&self) {
        let ctx = self.remote.lock().take();
        drop(ctx);
    }

    fn remote_handle(&self) -> Option<Handle> {
        self.remote.lock().as_ref().map(|ctx| ctx.handle())
    }

    fn forward(
        &self,
        destination: Handle,
        target: RemoteTarget,
        mut message: Message,
    ) -> Result<(), DeliveryError> {
        let unknown = || match &target {
            RemoteTarget::Handle(handle) => DeliveryError::UnknownDestination(*handle),
            RemoteTarget::Name(name) => DeliveryError::UnknownName(name.clone()),
        };

        let Some(remote) = self.remote_handle() else {
            self.report_undeliverable(destination, &message);
            return Err(unknown());
        };

        message.payload = harbor::encode(&target, &message.payload);
        match self.push_message(remote, message) {
            Ok(()) => Ok(()),
            Err(message) => {
                self.report_undeliverable(destination, &message);
                Err(unknown())
            }
        }
    }

    /// Tell the source of an undeliverable message that `destination` is gone
    fn report_undeliverable(&self, destination: Handle, message: &Message) {
        debug!(
            "Undeliverable message {} -> {} (session {})",
            message.source, destination, message.session
        );
        if message.source.is_none() || message.source == destination {
            return;
        }
        let notice = Message::new(destination, MessageType::Error, message.session, Vec::new());
        let _ = self.push_message(message.source, notice);
    }

    /// Disposal for messages stranded in the queue of a vanished actor
    pub(crate) fn drop_message(&self, handle: Handle, message: Message) {
        self.report_undeliverable(handle, &message);
    }

    /// Flag `handle` as suspected of looping forever
    pub fn mark_endless(&self, handle: Handle) {
        if let Some(ctx) = self.registry.grab(handle) {
            ctx.mark_endless();
        }
    }

    /// Post a `Response` with `session` to `handle` after `ticks`
    /// centiseconds; immediately when `ticks <= 0`.
    pub fn timeout(&self, handle: Handle, ticks: i64, session: i32) -> Result<i32, DeliveryError> {
        if ticks <= 0 {
            let message = Message::new(Handle::NONE, MessageType::Response, session, Vec::new());
            return self
                .push_message(handle, message)
                .map(|_| session)
                .map_err(|_| DeliveryError::UnknownDestination(handle));
        }
        self.timer.add(handle, session, ticks as u64);
        Ok(session)
    }

    /// Advance the clock and deliver due timeouts
    pub fn update_time(&self) {
        for due in self.timer.update() {
            let message = Message::new(Handle::NONE, MessageType::Response, due.session, Vec::new());
            if self.push_message(due.handle, message).is_err() {
                debug!("Timeout for vanished actor {}", due.handle);
            }
        }
    }

    /// The handle notified when an actor exits, if any
    pub fn monitor_exit(&self) -> Handle {
        Handle::new(self.monitor_exit.load(Ordering::Acquire))
    }

    pub(crate) fn set_monitor_exit(&self, handle: Handle) {
        self.monitor_exit.store(handle.raw(), Ordering::Release);
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("harbor", &self.harbor)
            .field("total", &self.total())
            .field("ready", &self.global.len())
            .finish()
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
