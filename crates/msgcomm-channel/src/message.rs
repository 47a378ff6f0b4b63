use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;

/// An owned, opaque message payload.
///
/// The wire form carries one extra trailing zero byte that is not part of
/// the payload.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Message {
    payload: Bytes,
}

impl Message {
    /// Create a message from any owned byte container.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// Create a message by copying a byte slice.
    pub fn copy_from_slice(payload: &[u8]) -> Self {
        Self {
            payload: Bytes::copy_from_slice(payload),
        }
    }

    /// Payload bytes, without the wire terminator.
    pub fn as_bytes(&self) -> &[u8] {
        self.payload.as_ref()
    }

    /// Payload length, without the wire terminator.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Number of bytes this message occupies on the wire.
    pub fn wire_len(&self) -> usize {
        self.payload.len() + 1
    }

    /// Payload as text, replacing invalid UTF-8.
    pub fn to_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.payload.as_ref())
    }

    /// Consume the message and return its payload.
    pub fn into_bytes(self) -> Bytes {
        self.payload
    }
}

impl AsRef<[u8]> for Message {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl From<String> for Message {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Message {
    fn from(value: &str) -> Self {
        Self::copy_from_slice(value.as_bytes())
    }
}

impl From<Vec<u8>> for Message {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

impl From<Bytes> for Message {
    fn from(value: Bytes) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(self.as_bytes()) {
            Ok(text) => f.debug_tuple("Message").field(&text).finish(),
            Err(_) => f
                .debug_tuple("Message")
                .field(&format_args!("<binary {} bytes>", self.len()))
                .finish(),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}
