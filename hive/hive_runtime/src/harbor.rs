//! Framing for messages forwarded to the harbor service.
//!
//! Messages for handles of another harbor, or for global names, are pushed
//! to the local harbor service with a header in front of the payload:
//!
//! - to a handle: the destination as 4 big-endian bytes
//! - to a name: 4 zero bytes, one length byte, then the name

use hive_core::Handle;

/// Longest global name that can be forwarded
pub const GLOBALNAME_LENGTH: usize = 16;

/// Where a forwarded message is going
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteTarget {
    /// A handle owned by another harbor
    Handle(Handle),
    /// A global name
    Name(String),
}

/// Prefix `payload` with the forwarding header for `target`
pub fn encode(target: &RemoteTarget, payload: &[u8]) -> Vec<u8> {
    match target {
        RemoteTarget::Handle(handle) => {
            let mut buf = Vec::with_capacity(4 + payload.len());
            buf.extend_from_slice(&handle.raw().to_be_bytes());
            buf.extend_from_slice(payload);
            buf
        }
        RemoteTarget::Name(name) => {
            let name = &name.as_bytes()[..name.len().min(GLOBALNAME_LENGTH)];
            let mut buf = Vec::with_capacity(5 + name.len() + payload.len());
            buf.extend_from_slice(&[0, 0, 0, 0, name.len() as u8]);
            buf.extend_from_slice(name);
            buf.extend_from_slice(payload);
            buf
        }
    }
}

/// Split a forwarded payload into its target and the original payload
pub fn decode(buf: &[u8]) -> Option<(RemoteTarget, &[u8])> {
    let raw = u32::from_be_bytes(buf.get(..4)?.try_into().ok()?);
    if raw != 0 {
        return Some((RemoteTarget::Handle(Handle::new(raw)), &buf[4..]));
    }
    let len = *buf.get(4)? as usize;
    let name = buf.get(5..5 + len)?;
    let name = String::from_utf8(name.to_vec()).ok()?;
    Some((RemoteTarget::Name(name), &buf[5 + len..]))
}
