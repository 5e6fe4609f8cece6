//! The worker dispatch step.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use hive_concurrency::scheduler::batch_size;
use hive_concurrency::{MessageQueue, WorkerMonitor};
use hive_core::{Handle, Message};
use log::{error, trace};

use crate::context::{ActorContext, ServiceContext};
use crate::module::Service;
use crate::node::{panic_message, Node};

impl Node {
    /// Run one visit of a worker.
    ///
    /// Continues with `queue` if the previous visit kept one, otherwise pops
    /// the global ready list. Dispatches one message, or `backlog >> weight`
    /// messages when `weight >= 0`, then returns the queue the worker should
    /// visit next. `None` means there is no ready work.
    pub fn dispatch(
        &self,
        monitor: &WorkerMonitor,
        queue: Option<Arc<MessageQueue>>,
        weight: i32,
    ) -> Option<Arc<MessageQueue>> {
        let queue = queue.or_else(|| self.global().pop())?;
        let handle = queue.handle();

        let Some(ctx) = self.grab(handle) else {
            // The actor is gone: drain what is left and move on
            queue.release(self.global(), |message| self.drop_message(handle, message));
            return self.global().pop();
        };

        let Some(mut instance) = ctx.try_instance() else {
            // Another worker is inside this actor: leave the queue to it
            self.report_concurrent_visit(handle);
            return self.global().pop();
        };

        let mut n = 1;
        let mut i = 0;
        let mut drained = false;
        while i < n {
            // Empty: unlinked below, once the service is released
            let Some(message) = queue.pop_if_any() else {
                drained = true;
                break;
            };

            if i == 0 {
                n = batch_size(queue.len() + 1, weight);
            }

            let overload = queue.take_overload();
            if overload > 0 {
                self.error(
                    handle,
                    &format!("May overload, message queue length = {}", overload),
                );
            }

            monitor.trigger(message.source, handle);
            self.dispatch_message(&ctx, &mut instance, message);
            monitor.trigger(Handle::NONE, Handle::NONE);
            i += 1;
        }
        // Released before the queue can reach another worker
        drop(instance);

        if drained && queue.unlink_if_empty() {
            return self.global().pop();
        }

        match self.global().pop() {
            Some(next) => {
                // More actors have work: go to the back of the line
                self.global().push(queue);
                Some(next)
            }
            None => Some(queue),
        }
    }

    /// Dispatch everything queued for `handle` on the calling thread.
    ///
    /// Only meant for when no worker runs, e.g. flushing the logger after a
    /// failed bootstrap. Returns the number of messages dispatched.
    pub fn dispatch_all(&self, handle: Handle) -> usize {
        let Some(ctx) = self.grab(handle) else {
            return 0;
        };
        let Some(mut instance) = ctx.try_instance() else {
            self.report_concurrent_visit(handle);
            return 0;
        };
        let mut count = 0;
        // Leaves the ready-list flag alone so a linked queue stays linked
        while let Some(message) = ctx.queue().pop_if_any() {
            self.dispatch_message(&ctx, &mut instance, message);
            count += 1;
        }
        count
    }

    fn report_concurrent_visit(&self, handle: Handle) {
        error!("{} is already being dispatched, visit skipped", handle);
        self.error(handle, "Concurrent dispatch detected, visit skipped");
    }

    fn dispatch_message(
        &self,
        ctx: &ActorContext,
        instance: &mut Box<dyn Service>,
        message: Message,
    ) {
        debug_assert!(ctx.is_initialized());
        let handle = ctx.handle();
        trace!("{} <- {:?}", handle, message);

        ctx.trace(&message, self.timer().now());
        ctx.count_message();

        let service_ctx = ServiceContext::new(self, ctx);
        let result =
            panic::catch_unwind(AssertUnwindSafe(|| instance.dispatch(&service_ctx, message)));

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => self.error(handle, &format!("dispatch error: {}", e)),
            Err(panic) => self.error(
                handle,
                &format!("dispatch panicked: {}", panic_message(panic.as_ref())),
            ),
        }
    }
}
