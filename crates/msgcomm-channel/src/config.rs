use std::time::Duration;

use crate::error::{ChannelError, Result};

/// Largest accepted timeout: one day, in seconds.
pub const MAX_TIMEOUT_SECS: u64 = 86_400;

/// Default size of the receive chunk buffer.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Byte written back by the receiver in acknowledgement mode.
pub const ACK_BYTE: u8 = 0x06;

/// Byte written back instead of [`ACK_BYTE`] when a message was rejected
/// (it did not fit the receiver's buffer). Resending it cannot succeed.
pub const REJECT_BYTE: u8 = 0x15;

/// Per-handle framing configuration.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Size of each read issued while reassembling a message. Default: 1 KiB.
    pub chunk_size: usize,
    /// Exchange a one-byte acknowledgement after every message.
    pub await_ack: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            await_ack: false,
        }
    }
}

/// Convert a timeout in whole seconds into a socket timeout.
///
/// `0` means "never time out" and maps to `None`.
pub fn timeout_from_secs(name: &'static str, secs: u64) -> Result<Option<Duration>> {
    if secs > MAX_TIMEOUT_SECS {
        return Err(ChannelError::IllegalTimeout {
            name,
            secs,
            max: MAX_TIMEOUT_SECS,
        });
    }
    Ok((secs > 0).then(|| Duration::from_secs(secs)))
}
