//! Zero-terminated message framing over point-to-point TCP connections.
//!
//! Every message on the wire is its payload followed by a single `0x00`
//! byte. There is no length prefix; the receiver reassembles messages from
//! fixed-size chunks, ends each message at its terminator and keeps any
//! bytes after it for the next message.
//!
//! A [`ConnectionHandle`] is either a listener (one accepted peer at a time)
//! or a client. Every operation records a [`Status`] on the handle.
//!
//! Payloads containing `0x00` are not guaranteed to round-trip.

pub mod config;
pub mod error;
pub mod handle;
pub mod message;
pub mod reader;
pub mod status;
mod sys;
pub mod writer;

pub use config::{
    timeout_from_secs, ChannelConfig, ACK_BYTE, DEFAULT_CHUNK_SIZE, MAX_TIMEOUT_SECS, REJECT_BYTE,
};
pub use error::{ChannelError, Result};
pub use handle::{ConnectionHandle, HandleRole, LISTEN_BACKLOG};
pub use message::Message;
pub use reader::{message_payload, MessageReader};
pub use status::Status;
pub use writer::{read_ack, write_ack, write_message, write_reject, MessageWriter};
