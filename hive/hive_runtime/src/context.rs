//! Actor contexts.
//!
//! An [`ActorContext`] is shared through `Arc`: the creator holds one
//! reference until init returns and the handle registry holds one until the
//! handle is retired. Every send path takes a temporary reference with
//! `grab`, so the context outlives the push. When the last reference is
//! dropped the service is released, the queue is marked for release and
//! the live-actor total is decremented.

use std::fmt;
use std::fs::File;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use hive_concurrency::sync::{AtomicCounter, AtomicFlag, SessionCounter, SpinLock};
use hive_concurrency::{GlobalQueue, MessageQueue, Registrant};
use hive_core::error::{DeliveryError, LaunchError};
use hive_core::{Handle, Message, MessageType};
use log::{debug, warn};
use parking_lot::{Mutex, MutexGuard};

use crate::logfile;
use crate::module::Service;
use crate::node::Node;

/// One live actor
pub struct ActorContext {
    module: String,
    queue: Arc<MessageQueue>,
    instance: Mutex<Box<dyn Service>>,
    session: SessionCounter,
    initialized: AtomicFlag,
    endless: AtomicFlag,
    signal: SpinLock<Option<i32>>,
    logfile: Mutex<Option<File>>,
    message_count: AtomicU64,
    global: Arc<GlobalQueue>,
    total: Arc<AtomicCounter>,
}

impl ActorContext {
    /// Create a context around a fresh service instance.
    ///
    /// Counts toward the live-actor total until dropped.
    pub(crate) fn new(
        module: &str,
        instance: Box<dyn Service>,
        global: Arc<GlobalQueue>,
        total: Arc<AtomicCounter>,
    ) -> Self {
        total.increment();
        Self {
            module: module.to_string(),
            queue: MessageQueue::new(Handle::NONE),
            instance: Mutex::new(instance),
            session: SessionCounter::starting_after(0),
            initialized: AtomicFlag::new(false),
            endless: AtomicFlag::new(false),
            signal: SpinLock::new(None),
            logfile: Mutex::new(None),
            message_count: AtomicU64::new(0),
            global,
            total,
        }
    }

    /// The actor's handle
    pub fn handle(&self) -> Handle {
        self.queue.handle()
    }

    /// Name of the module this actor was launched from
    pub fn module(&self) -> &str {
        &self.module
    }

    /// The actor's message queue
    pub fn queue(&self) -> &Arc<MessageQueue> {
        &self.queue
    }

    /// Allocate a new session id (strictly positive, wraps to 1)
    pub fn new_session(&self) -> i32 {
        self.session.next()
    }

    /// Whether init completed successfully
    pub fn is_initialized(&self) -> bool {
        self.initialized.is_set()
    }

    pub(crate) fn mark_initialized(&self) {
        self.initialized.set();
    }

    /// Flag the actor as suspected of looping forever
    pub fn mark_endless(&self) {
        self.endless.set();
    }

    /// Read and clear the endless flag
    pub fn take_endless(&self) -> bool {
        self.endless.unset()
    }

    /// Post a signal for the service to pick up; replaces an unread one
    pub fn signal(&self, sig: i32) {
        *self.signal.lock() = Some(sig);
    }

    /// Take the pending signal, if any
    pub fn take_signal(&self) -> Option<i32> {
        self.signal.lock().take()
    }

    /// Number of messages dispatched to this actor
    pub fn message_count(&self) -> u64 {
        self.message_count.load(Ordering::Relaxed)
    }

    /// Claim the service for one init or dispatch visit.
    ///
    /// Never blocks: the ready-list gate guarantees a single visitor, so
    /// `None` means that guarantee was broken.
    pub(crate) fn try_instance(&self) -> Option<MutexGuard<'_, Box<dyn Service>>> {
        self.instance.try_lock()
    }

    pub(crate) fn count_message(&self) {
        self.message_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Start tracing dispatched messages to a file. Returns false if
    /// tracing was already on.
    pub(crate) fn trace_on(&self, file: File) -> bool {
        let mut slot = self.logfile.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(file);
        true
    }

    /// Stop tracing, returning the open trace file
    pub(crate) fn trace_off(&self) -> Option<File> {
        self.logfile.lock().take()
    }

    pub(crate) fn trace(&self, message: &Message, ticks: u64) {
        let mut slot = self.logfile.lock();
        if let Some(file) = slot.as_mut() {
            if let Err(e) = logfile::output(file, message, ticks) {
                warn!("Trace of {} failed, closing: {}", self.handle(), e);
                *slot = None;
            }
        }
    }
}

impl Registrant for ActorContext {
    fn handle(&self) -> Handle {
        self.queue.handle()
    }

    fn assign_handle(&self, handle: Handle) {
        self.queue.assign_handle(handle);
    }
}

impl Drop for ActorContext {
    fn drop(&mut self) {
        let handle = self.handle();
        debug!("Releasing {} ({})", handle, self.module);

        if let Some(mut file) = self.logfile.get_mut().take() {
            let _ = logfile::close(&mut file, chrono::Utc::now().timestamp());
        }
        self.instance.get_mut().release();
        self.queue.mark_release(&self.global);
        self.total.decrement();
    }
}

impl fmt::Debug for ActorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorContext")
            .field("handle", &self.handle())
            .field("module", &self.module)
            .field("initialized", &self.is_initialized())
            .field("queue_len", &self.queue.len())
            .finish()
    }
}

/// What a service sees of the node while it runs.
///
/// Passed into every `init` and `dispatch` call; it identifies the running
/// actor so diagnostics and sends are attributed to it.
#[derive(Clone, Copy)]
pub struct ServiceContext<'a> {
    node: &'a Node,
    actor: &'a ActorContext,
}

impl<'a> ServiceContext<'a> {
    pub(crate) fn new(node: &'a Node, actor: &'a ActorContext) -> Self {
        Self { node, actor }
    }

    /// The node hosting this actor
    pub fn node(&self) -> &'a Node {
        self.node
    }

    /// The running actor
    pub fn actor(&self) -> &'a ActorContext {
        self.actor
    }

    /// Handle of the running actor
    pub fn handle(&self) -> Handle {
        self.actor.handle()
    }

    /// Allocate a new session id
    pub fn new_session(&self) -> i32 {
        self.actor.new_session()
    }

    /// Send a message from this actor; returns the session used
    pub fn send(
        &self,
        destination: Handle,
        kind: MessageType,
        session: i32,
        payload: Vec<u8>,
    ) -> Result<i32, DeliveryError> {
        self.node
            .send(self.actor, Handle::NONE, destination, kind, session, payload)
    }

    /// Send a request with a freshly allocated session; returns the session
    pub fn call(
        &self,
        destination: Handle,
        kind: MessageType,
        payload: Vec<u8>,
    ) -> Result<i32, DeliveryError> {
        self.node
            .call(self.actor, Handle::NONE, destination, kind, payload)
    }

    /// Reply to `request` with a `Response` carrying its session
    pub fn respond(&self, request: &Message, payload: Vec<u8>) -> Result<i32, DeliveryError> {
        self.send(request.source, MessageType::Response, request.session, payload)
    }

    /// Send to an address: `:hex`, `.name`, or a global name
    pub fn send_name(
        &self,
        address: &str,
        kind: MessageType,
        session: i32,
        payload: Vec<u8>,
    ) -> Result<i32, DeliveryError> {
        self.node
            .send_name(self.actor, Handle::NONE, address, kind, session, payload)
    }

    /// Run an administrative command on behalf of this actor
    pub fn command(&self, cmd: &str, param: &str) -> Option<String> {
        self.node.command(self.actor, cmd, param)
    }

    /// Launch another actor
    pub fn launch(&self, module: &str, args: &str) -> Result<Handle, LaunchError> {
        self.node.launch(module, args)
    }

    /// Resolve `:hex` or `.name`
    pub fn query_name(&self, name: &str) -> Option<Handle> {
        self.node.query_name(name)
    }

    /// Report a diagnostic attributed to this actor
    pub fn error(&self, text: impl AsRef<str>) {
        self.node.error(self.handle(), text.as_ref());
    }

    /// Take the pending signal, if any
    pub fn take_signal(&self) -> Option<i32> {
        self.actor.take_signal()
    }
}

impl fmt::Debug for ServiceContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContext")
            .field("handle", &self.handle())
            .finish()
    }
}
