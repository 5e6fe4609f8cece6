//! Per-actor message traces.
//!
//! While tracing is on (`LOGON`), every message dispatched to an actor is
//! appended to `<logpath>/<handle>.log` as one line:
//! `:<source> <type> <session> <time> <hex payload>`.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use chrono::{Local, TimeZone};
use hive_core::{Handle, Message};

fn stamp(unix_secs: i64) -> String {
    Local
        .timestamp_opt(unix_secs, 0)
        .single()
        .map(|t| t.format("%a %b %e %H:%M:%S %Y").to_string())
        .unwrap_or_default()
}

/// Open (append) the trace file of `handle` under `logpath`
pub fn open(logpath: &Path, handle: Handle, unix_secs: i64) -> io::Result<File> {
    let path = logpath.join(format!("{:08x}.log", handle.raw()));
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "open time: {} {}", unix_secs, stamp(unix_secs))?;
    file.flush()?;
    Ok(file)
}

/// Write the closing line of a trace file
pub fn close(file: &mut File, unix_secs: i64) -> io::Result<()> {
    writeln!(file, "close time: {} {}", unix_secs, stamp(unix_secs))?;
    file.flush()
}

/// Append one dispatched message; `ticks` is node time in centiseconds
pub fn output(file: &mut File, message: &Message, ticks: u64) -> io::Result<()> {
    let mut line = format!(
        ":{:08x} {} {} {} ",
        message.source.raw(),
        message.kind.as_u8(),
        message.session,
        ticks
    );
    for byte in &message.payload {
        line.push_str(&format!("{:02x}", byte));
    }
    writeln!(file, "{}", line)?;
    file.flush()
}
