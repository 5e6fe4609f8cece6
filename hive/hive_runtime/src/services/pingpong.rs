//! A request/response demo.
//!
//! `pingpong <rounds> [abort]` launches a `pong` peer and exchanges
//! `<rounds>` calls with it, matching every response by session. When done
//! it kills the peer and exits, or aborts the whole node if `abort` was
//! given.

use hive_core::{Error, Handle, Message, MessageType, Result};

use crate::context::ServiceContext;
use crate::module::Service;

const DEFAULT_ROUNDS: u32 = 10;

/// The initiating side
#[derive(Debug, Default)]
pub struct PingPong {
    peer: Handle,
    rounds: u32,
    completed: u32,
    pending: i32,
    abort: bool,
}

impl PingPong {
    fn ping(&mut self, ctx: &ServiceContext<'_>) -> Result<()> {
        let payload = format!("ping {}", self.completed + 1).into_bytes();
        self.pending = ctx.call(self.peer, MessageType::Client, payload)?;
        Ok(())
    }

    fn finish(&mut self, ctx: &ServiceContext<'_>) {
        ctx.error(format!(
            "pingpong finished {}/{} rounds",
            self.completed, self.rounds
        ));
        ctx.command("KILL", &self.peer.to_string());
        if self.abort {
            ctx.command("ABORT", "");
        } else {
            ctx.command("EXIT", "");
        }
    }
}

impl Service for PingPong {
    fn init(&mut self, ctx: &ServiceContext<'_>, args: &str) -> Result<()> {
        let mut parts = args.split_whitespace();
        self.rounds = match parts.next() {
            Some(rounds) => rounds
                .parse()
                .map_err(|_| Error::Service(format!("invalid round count: {}", rounds)))?,
            None => DEFAULT_ROUNDS,
        }
        .max(1);
        self.abort = parts.next() == Some("abort");

        self.peer = ctx.launch("pong", "")?;
        self.ping(ctx)
    }

    fn dispatch(&mut self, ctx: &ServiceContext<'_>, message: Message) -> Result<()> {
        match message.kind {
            MessageType::Response if message.session == self.pending => {
                self.completed += 1;
                if self.completed >= self.rounds {
                    self.finish(ctx);
                    Ok(())
                } else {
                    self.ping(ctx)
                }
            }
            MessageType::Error => {
                ctx.error(format!("peer {} vanished", message.source));
                self.finish(ctx);
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// The answering side: echoes every `Client` message back as a response
#[derive(Debug, Default)]
pub struct Pong;

impl Service for Pong {
    fn init(&mut self, _ctx: &ServiceContext<'_>, _args: &str) -> Result<()> {
        Ok(())
    }

    fn dispatch(&mut self, ctx: &ServiceContext<'_>, message: Message) -> Result<()> {
        if message.kind == MessageType::Client {
            ctx.respond(&message, message.payload.clone())?;
        }
        Ok(())
    }
}
