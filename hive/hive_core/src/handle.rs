//! Actor handles.
//!
//! A handle is a 32-bit integer. The low 24 bits are a slot index that is
//! unique on the local node, the high 8 bits carry the harbor (node id) the
//! actor lives on. Handle `0` is reserved and never names an actor.
//!
//! # Examples
//!
//! ```
//! use hive_core::handle::{Handle, HarborId};
//!
//! let handle = Handle::from_parts(HarborId::new(3), 0x10);
//! assert_eq!(handle.harbor(), HarborId::new(3));
//! assert_eq!(handle.local(), 0x10);
//! assert_eq!(handle.to_string(), ":03000010");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mask selecting the local slot bits of a handle.
pub const HANDLE_MASK: u32 = 0x00ff_ffff;

/// Shift that moves a harbor id into the high byte of a handle.
pub const HANDLE_REMOTE_SHIFT: u32 = 24;

/// Identifier of a node in a cluster, stored in the high byte of a handle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HarborId(u8);

impl HarborId {
    /// Create a harbor id.
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    /// The raw harbor number.
    pub const fn get(self) -> u8 {
        self.0
    }

    /// The harbor id shifted into handle position.
    pub const fn bits(self) -> u32 {
        (self.0 as u32) << HANDLE_REMOTE_SHIFT
    }
}

impl fmt::Display for HarborId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 32-bit actor handle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(u32);

impl Handle {
    /// The reserved invalid handle.
    pub const NONE: Handle = Handle(0);

    /// Wrap a raw handle value.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Build a handle from a harbor id and a local slot index.
    pub const fn from_parts(harbor: HarborId, local: u32) -> Self {
        Self((local & HANDLE_MASK) | harbor.bits())
    }

    /// The raw 32-bit value.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// The local slot bits.
    pub const fn local(self) -> u32 {
        self.0 & HANDLE_MASK
    }

    /// The harbor this handle belongs to.
    pub const fn harbor(self) -> HarborId {
        HarborId((self.0 >> HANDLE_REMOTE_SHIFT) as u8)
    }

    /// Whether this is the reserved handle `0`.
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Whether the handle lives on a node other than `local`.
    ///
    /// Handles without harbor bits are always considered local.
    pub fn is_remote(self, local: HarborId) -> bool {
        let harbor = self.0 & !HANDLE_MASK;
        harbor != 0 && harbor != local.bits()
    }
}

impl From<u32> for Handle {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl From<Handle> for u32 {
    fn from(handle: Handle) -> Self {
        handle.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{:08x}", self.0)
    }
}

impl fmt::LowerHex for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Error returned when a string is not a `:hex` handle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid handle literal: {0}")]
pub struct ParseHandleError(pub String);

impl FromStr for Handle {
    type Err = ParseHandleError;

    /// Parse the `:hex` form produced by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix(':')
            .ok_or_else(|| ParseHandleError(s.to_string()))?;
        u32::from_str_radix(digits.trim(), 16)
            .map(Handle)
            .map_err(|_| ParseHandleError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts_roundtrip() {
        let handle = Handle::from_parts(HarborId::new(0xab), 0x12_3456);
        assert_eq!(handle.raw(), 0xab12_3456);
        assert_eq!(handle.local(), 0x12_3456);
        assert_eq!(handle.harbor().get(), 0xab);
    }

    #[test]
    fn test_local_bits_are_masked() {
        let handle = Handle::from_parts(HarborId::new(1), 0xff00_0001);
        assert_eq!(handle.raw(), 0x0100_0001);
    }

    #[test]
    fn test_is_remote() {
        let local = HarborId::new(1);
        assert!(!Handle::new(0x0000_0005).is_remote(local));
        assert!(!Handle::new(0x0100_0005).is_remote(local));
        assert!(Handle::new(0x0200_0005).is_remote(local));
        assert!(Handle::new(0xffff_ffff).is_remote(HarborId::default()));
    }

    #[test]
    fn test_display_and_parse() {
        let handle = Handle::new(0x2a);
        assert_eq!(handle.to_string(), ":0000002a");
        assert_eq!(":2a".parse::<Handle>().unwrap(), handle);
        assert_eq!(":0000002a".parse::<Handle>().unwrap(), handle);
        assert!("2a".parse::<Handle>().is_err());
        assert!(":zz".parse::<Handle>().is_err());
    }
}
