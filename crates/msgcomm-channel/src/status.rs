//! Result codes recorded on a [`ConnectionHandle`](crate::ConnectionHandle).
//!
//! Codes are grouped by range:
//! - 100-199: per-message results
//! - 200-299: setup and validity errors
//! - 300-399: connection lifecycle events

use std::fmt;

/// Outcome of the last operation performed on a connection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Status {
    /// One message (payload plus terminator) was written.
    MessageSent = 100,
    /// The write failed; the peer socket has been closed.
    MessageNotSent = 101,
    /// One complete message was received.
    MessageRecvd = 102,
    /// The peer disconnected (or reset) before sending anything.
    MessageNotRecvd = 103,
    /// The incoming message does not fit the caller's buffer.
    MessageOverflow = 104,
    /// The read timeout expired before a complete message arrived.
    MessageRecvTimeout = 105,
    /// Acknowledgement mode: no (or a wrong) ack byte came back.
    AckRecvFail = 106,

    /// A timeout was outside `0..=86400` seconds.
    IllegalInput = 201,
    AddressResolutionError = 202,
    SocketCreateError = 203,
    OptionSetError = 204,
    BindError = 205,
    ListenError = 206,
    ConnectError = 207,
    AcceptError = 208,
    /// The handle is invalid or has been closed.
    InvalidHandle = 209,
    /// No resolved address accepted the connection, or no peer is attached.
    NoConnect = 210,

    /// The accept wait expired while cancellation was requested.
    ConnectTimeout = 301,
    ListenerCreated = 302,
    ClientConnected = 303,
}

impl Status {
    /// Stable numeric code.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Stable human-readable name for logs.
    pub fn name(self) -> &'static str {
        match self {
            Status::MessageSent => "MESSAGE_SENT",
            Status::MessageNotSent => "MESSAGE_NOT_SENT",
            Status::MessageRecvd => "MESSAGE_RECVD",
            Status::MessageNotRecvd => "MESSAGE_NOT_RECVD",
            Status::MessageOverflow => "MESSAGE_OVERFLOW",
            Status::MessageRecvTimeout => "MESSAGE_RECV_TIMEOUT",
            Status::AckRecvFail => "ACK_RECV_FAIL",
            Status::IllegalInput => "ILLEGAL_INPUT",
            Status::AddressResolutionError => "ADDRESS_RESOLUTION_ERROR",
            Status::SocketCreateError => "SOCKET_CREATE_ERROR",
            Status::OptionSetError => "OPTION_SET_ERROR",
            Status::BindError => "BIND_ERROR",
            Status::ListenError => "LISTEN_ERROR",
            Status::ConnectError => "CONNECT_ERROR",
            Status::AcceptError => "ACCEPT_ERROR",
            Status::InvalidHandle => "INVALID_HANDLE",
            Status::NoConnect => "NO_CONNECT",
            Status::ConnectTimeout => "CONNECT_TIMEOUT",
            Status::ListenerCreated => "LISTENER_CREATED",
            Status::ClientConnected => "CLIENT_CONNECTED",
        }
    }

    /// Look a status up by its numeric code.
    pub fn from_code(code: u16) -> Option<Self> {
        ALL.iter().copied().find(|status| status.code() == code)
    }

    /// Returns true for codes that describe an expected wait expiring.
    pub fn is_timeout(self) -> bool {
        matches!(self, Status::MessageRecvTimeout | Status::ConnectTimeout)
    }

    /// Returns true for the 2xx setup/validity range.
    pub fn is_setup_error(self) -> bool {
        (200..300).contains(&self.code())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const ALL: [Status; 20] = [
    Status::MessageSent,
    Status::MessageNotSent,
    Status::MessageRecvd,
    Status::MessageNotRecvd,
    Status::MessageOverflow,
    Status::MessageRecvTimeout,
    Status::AckRecvFail,
    Status::IllegalInput,
    Status::AddressResolutionError,
    Status::SocketCreateError,
    Status::OptionSetError,
    Status::BindError,
    Status::ListenError,
    Status::ConnectError,
    Status::AcceptError,
    Status::InvalidHandle,
    Status::NoConnect,
    Status::ConnectTimeout,
    Status::ListenerCreated,
    Status::ClientConnected,
];
