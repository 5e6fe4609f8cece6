//! The message envelope carried by actor queues.
//!
//! Payloads are opaque byte buffers. Ownership of a message moves into the
//! destination queue on push, and from the queue to the dispatcher on pop;
//! the service that receives a message owns its payload and releases it by
//! dropping it.

use crate::handle::Handle;
use std::fmt;

/// Payloads must be strictly smaller than this many bytes.
pub const MESSAGE_SIZE_MAX: usize = 0x0100_0000;

/// Type tag of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Human readable text, used for diagnostics routed to the logger.
    Text,
    /// Response to an earlier request, correlated by session.
    Response,
    /// Multicast delivery.
    Multicast,
    /// Client protocol message.
    Client,
    /// System message.
    System,
    /// Message travelling through the harbor service.
    Harbor,
    /// Event forwarded by the network reactor.
    Socket,
    /// Delivery failure notification.
    Error,
    /// Any other application defined tag.
    User(u8),
}

impl MessageType {
    /// Numeric tag value.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Text => 0,
            Self::Response => 1,
            Self::Multicast => 2,
            Self::Client => 3,
            Self::System => 4,
            Self::Harbor => 5,
            Self::Socket => 6,
            Self::Error => 7,
            Self::User(tag) => tag,
        }
    }
}

impl From<u8> for MessageType {
    fn from(tag: u8) -> Self {
        match tag {
            0 => Self::Text,
            1 => Self::Response,
            2 => Self::Multicast,
            3 => Self::Client,
            4 => Self::System,
            5 => Self::Harbor,
            6 => Self::Socket,
            7 => Self::Error,
            other => Self::User(other),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// A message queued for an actor.
///
/// The destination is implied by the queue that holds the message.
#[derive(Clone, PartialEq, Eq)]
pub struct Message {
    /// Sender handle, `Handle::NONE` for messages originating outside any actor.
    pub source: Handle,
    /// Correlation id for request/response pairs, `0` when unused.
    pub session: i32,
    /// Type tag.
    pub kind: MessageType,
    /// Opaque payload.
    pub payload: Vec<u8>,
}

impl Message {
    /// Create a message.
    pub fn new(source: Handle, kind: MessageType, session: i32, payload: Vec<u8>) -> Self {
        Self {
            source,
            session,
            kind,
            payload,
        }
    }

    /// Create a text message.
    pub fn text(source: Handle, text: impl Into<String>) -> Self {
        Self::new(source, MessageType::Text, 0, text.into().into_bytes())
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Payload interpreted as UTF-8, with invalid sequences replaced.
    pub fn text_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("source", &self.source)
            .field("session", &self.session)
            .field("kind", &self.kind)
            .field("len", &self.payload.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tags() {
        for tag in 0..=255u8 {
            assert_eq!(MessageType::from(tag).as_u8(), tag);
        }
        assert_eq!(MessageType::from(7), MessageType::Error);
        assert_eq!(MessageType::from(42), MessageType::User(42));
    }

    #[test]
    fn test_text_message() {
        let message = Message::text(Handle::new(1), "hello");
        assert_eq!(message.kind, MessageType::Text);
        assert_eq!(message.session, 0);
        assert_eq!(message.text_lossy(), "hello");
        assert_eq!(message.len(), 5);
    }
}
