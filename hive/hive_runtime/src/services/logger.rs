//! The logging service.
//!
//! Writes every `Text` message as `[:source] text` to a file, or to the
//! `log` facade when launched without a path. A `System` message reopens
//! the file, for use after log rotation.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use hive_core::{Message, MessageType, Result};
use log::info;

use crate::context::ServiceContext;
use crate::module::Service;

/// Logger service state
#[derive(Debug, Default)]
pub struct Logger {
    path: Option<PathBuf>,
    file: Option<File>,
}

impl Logger {
    fn open(&mut self) -> Result<()> {
        if let Some(path) = &self.path {
            self.file = Some(OpenOptions::new().create(true).append(true).open(path)?);
        }
        Ok(())
    }
}

impl Service for Logger {
    fn init(&mut self, _ctx: &ServiceContext<'_>, args: &str) -> Result<()> {
        if !args.is_empty() {
            self.path = Some(PathBuf::from(args));
        }
        self.open()
    }

    fn dispatch(&mut self, _ctx: &ServiceContext<'_>, message: Message) -> Result<()> {
        match message.kind {
            MessageType::Text => {
                let line = format!("[{}] {}", message.source, message.text_lossy());
                match self.file.as_mut() {
                    Some(file) => {
                        writeln!(file, "{}", line)?;
                        file.flush()?;
                    }
                    None => info!("{}", line),
                }
            }
            MessageType::System => self.open()?,
            _ => {}
        }
        Ok(())
    }
}
