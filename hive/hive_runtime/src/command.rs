//! Administrative text commands.
//!
//! Services issue these on themselves through
//! [`ServiceContext::command`](crate::context::ServiceContext::command).
//! Each command takes a parameter string and may return a result string.

use hive_core::{Handle, MessageType};
use log::{info, warn};

use crate::context::ActorContext;
use crate::logfile;
use crate::node::Node;

type CommandFn = fn(&Node, &ActorContext, &str) -> Option<String>;

const COMMANDS: &[(&str, CommandFn)] = &[
    ("TIMEOUT", cmd_timeout),
    ("REG", cmd_reg),
    ("QUERY", cmd_query),
    ("NAME", cmd_name),
    ("NOW", cmd_now),
    ("EXIT", cmd_exit),
    ("KILL", cmd_kill),
    ("LAUNCH", cmd_launch),
    ("GETENV", cmd_getenv),
    ("SETENV", cmd_setenv),
    ("STARTTIME", cmd_starttime),
    ("ENDLESS", cmd_endless),
    ("ABORT", cmd_abort),
    ("MONITOR", cmd_monitor),
    ("MQLEN", cmd_mqlen),
    ("LOGON", cmd_logon),
    ("LOGOFF", cmd_logoff),
    ("SIGNAL", cmd_signal),
];

impl Node {
    /// Run command `cmd` with `param` on behalf of `ctx`.
    ///
    /// Unknown commands return `None`.
    pub fn command(&self, ctx: &ActorContext, cmd: &str, param: &str) -> Option<String> {
        COMMANDS
            .iter()
            .find(|(name, _)| *name == cmd)
            .and_then(|(_, run)| run(self, ctx, param.trim()))
    }

    /// Retire `handle` (the caller itself when `Handle::NONE`), telling the
    /// exit monitor first.
    fn handle_exit(&self, ctx: &ActorContext, handle: Handle) {
        let handle = if handle.is_none() {
            self.error(ctx.handle(), "KILL self");
            ctx.handle()
        } else {
            self.error(ctx.handle(), &format!("KILL {}", handle));
            handle
        };

        let monitor = self.monitor_exit();
        if !monitor.is_none() {
            let _ = self.send(ctx, handle, monitor, MessageType::Client, 0, Vec::new());
        }
        self.retire(handle);
    }

    fn to_handle(&self, ctx: &ActorContext, param: &str) -> Option<Handle> {
        let handle = self.query_name(param);
        if handle.is_none() {
            self.error(ctx.handle(), &format!("Can't convert {} to handle", param));
        }
        handle
    }

    fn set_trace(&self, ctx: &ActorContext, param: &str, on: bool) {
        let Some(target) = self.to_handle(ctx, param).and_then(|h| self.grab(h)) else {
            return;
        };
        let now = chrono::Utc::now().timestamp();

        if !on {
            if let Some(mut file) = target.trace_off() {
                if let Err(e) = logfile::close(&mut file, now) {
                    warn!("Closing trace of {} failed: {}", target.handle(), e);
                }
                self.error(target.handle(), &format!("Close log file :{:08x}", target.handle().raw()));
            }
            return;
        }

        let Some(dir) = self.logpath() else {
            self.error(ctx.handle(), "LOGON: no logpath configured");
            return;
        };
        match logfile::open(dir, target.handle(), now) {
            Ok(file) => {
                if target.trace_on(file) {
                    self.error(
                        target.handle(),
                        &format!("Open log file :{:08x}", target.handle().raw()),
                    );
                }
            }
            Err(e) => self.error(
                ctx.handle(),
                &format!("Open log file :{:08x} failed: {}", target.handle().raw(), e),
            ),
        }
    }
}

fn cmd_timeout(node: &Node, ctx: &ActorContext, param: &str) -> Option<String> {
    let ticks: i64 = param.parse().ok()?;
    let session = ctx.new_session();
    node.timeout(ctx.handle(), ticks, session).ok()?;
    Some(session.to_string())
}

fn cmd_reg(node: &Node, ctx: &ActorContext, param: &str) -> Option<String> {
    if param.is_empty() {
        return Some(ctx.handle().to_string());
    }
    match param.strip_prefix('.') {
        Some(name) if node.bind_name(ctx.handle(), name) => Some(name.to_string()),
        Some(_) => None,
        None => {
            node.error(ctx.handle(), &format!("Can't register global name {}", param));
            None
        }
    }
}

fn cmd_query(node: &Node, _ctx: &ActorContext, param: &str) -> Option<String> {
    if !param.starts_with('.') {
        return None;
    }
    node.query_name(param).map(|handle| handle.to_string())
}

fn cmd_name(node: &Node, ctx: &ActorContext, param: &str) -> Option<String> {
    let (name, handle) = param.split_once(char::is_whitespace)?;
    let handle: Handle = handle.trim().parse().ok()?;
    match name.strip_prefix('.') {
        Some(local) if node.bind_name(handle, local) => Some(local.to_string()),
        Some(_) => None,
        None => {
            node.error(ctx.handle(), &format!("Can't set global name {}", name));
            None
        }
    }
}

fn cmd_now(node: &Node, _ctx: &ActorContext, _param: &str) -> Option<String> {
    Some(node.timer().now().to_string())
}

fn cmd_exit(node: &Node, ctx: &ActorContext, _param: &str) -> Option<String> {
    node.handle_exit(ctx, Handle::NONE);
    None
}

fn cmd_kill(node: &Node, ctx: &ActorContext, param: &str) -> Option<String> {
    if let Some(handle) = node.to_handle(ctx, param) {
        node.handle_exit(ctx, handle);
    }
    None
}

fn cmd_launch(node: &Node, _ctx: &ActorContext, param: &str) -> Option<String> {
    let (module, args) = match param.split_once(char::is_whitespace) {
        Some((module, args)) => (module, args.trim()),
        None => (param, ""),
    };
    node.launch(module, args).ok().map(|handle| handle.to_string())
}

fn cmd_getenv(node: &Node, _ctx: &ActorContext, param: &str) -> Option<String> {
    node.env().get(param)
}

fn cmd_setenv(node: &Node, ctx: &ActorContext, param: &str) -> Option<String> {
    let (key, value) = param.split_once(char::is_whitespace)?;
    if !node.env().set(key, value.trim()) {
        node.error(ctx.handle(), &format!("Env {} is already set", key));
    }
    None
}

fn cmd_starttime(node: &Node, _ctx: &ActorContext, _param: &str) -> Option<String> {
    Some(node.timer().start_time().to_string())
}

fn cmd_endless(_node: &Node, ctx: &ActorContext, _param: &str) -> Option<String> {
    ctx.take_endless().then(|| "1".to_string())
}

fn cmd_abort(node: &Node, ctx: &ActorContext, _param: &str) -> Option<String> {
    info!("Abort requested by {}", ctx.handle());
    node.retire_all();
    None
}

fn cmd_monitor(node: &Node, ctx: &ActorContext, param: &str) -> Option<String> {
    if param.is_empty() {
        let monitor = node.monitor_exit();
        return (!monitor.is_none()).then(|| monitor.to_string());
    }
    if let Some(handle) = node.to_handle(ctx, param) {
        node.set_monitor_exit(handle);
    }
    None
}

fn cmd_mqlen(_node: &Node, ctx: &ActorContext, _param: &str) -> Option<String> {
    Some(ctx.queue().len().to_string())
}

fn cmd_logon(node: &Node, ctx: &ActorContext, param: &str) -> Option<String> {
    node.set_trace(ctx, param, true);
    None
}

fn cmd_logoff(node: &Node, ctx: &ActorContext, param: &str) -> Option<String> {
    node.set_trace(ctx, param, false);
    None
}

fn cmd_signal(node: &Node, ctx: &ActorContext, param: &str) -> Option<String> {
    let (target, sig) = match param.split_once(char::is_whitespace) {
        Some((target, sig)) => (target, sig.trim().parse().unwrap_or(0)),
        None => (param, 0),
    };
    if let Some(target) = node.to_handle(ctx, target).and_then(|h| node.grab(h)) {
        target.signal(sig);
    }
    None
}
