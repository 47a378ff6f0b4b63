use crate::status::Status;

/// Errors that can occur in channel operations.
///
/// Every variant maps to exactly one [`Status`] via [`ChannelError::status`].
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// A timeout argument was outside the accepted range.
    #[error("invalid {name} timeout {secs}s (max {max}s)")]
    IllegalTimeout {
        name: &'static str,
        secs: u64,
        max: u64,
    },

    /// The host/port pair could not be resolved.
    #[error("failed to resolve {addr}: {source}")]
    AddressResolution {
        addr: String,
        source: std::io::Error,
    },

    /// The platform refused to create a socket of the requested family.
    #[error("failed to create socket for {addr}: {source}")]
    SocketCreate {
        addr: String,
        source: std::io::Error,
    },

    /// A socket option could not be applied.
    #[error("failed to set {option}: {source}")]
    OptionSet {
        option: &'static str,
        source: std::io::Error,
    },

    /// Failed to bind to the specified address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// The OS listen call failed.
    #[error("listen failed: {0}")]
    Listen(std::io::Error),

    /// No resolved address accepted the connection.
    #[error("could not connect to {addr}")]
    NoConnect { addr: String },

    /// Accepting a connection failed while cancellation was requested.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// The accept wait expired and cancellation was requested.
    #[error("accept wait cancelled")]
    ConnectTimeout,

    /// The operation needs a state the handle is not in.
    #[error("invalid handle: {0}")]
    InvalidHandle(&'static str),

    /// The peer socket write failed.
    #[error("message not sent: {0}")]
    NotSent(std::io::Error),

    /// Acknowledgement mode: the ack byte did not arrive or was wrong.
    #[error("acknowledgement not received: {0}")]
    AckFailed(String),

    /// Acknowledgement mode: the receiver refused the message.
    #[error("message rejected by receiver")]
    Rejected,

    /// The peer went away before a message arrived.
    #[error("peer disconnected before sending a message")]
    Disconnected,

    /// The read timeout expired.
    #[error("receive timed out")]
    RecvTimeout,

    /// The incoming message exceeds the caller's buffer.
    #[error("message overflow ({needed} bytes needed, max {max})")]
    Overflow { needed: usize, max: usize },

    /// Any other I/O error while reading.
    #[error("receive failed: {0}")]
    Io(#[from] std::io::Error),
}

impl ChannelError {
    /// The result code this error is reported as.
    pub fn status(&self) -> Status {
        match self {
            ChannelError::IllegalTimeout { .. } => Status::IllegalInput,
            ChannelError::AddressResolution { .. } => Status::AddressResolutionError,
            ChannelError::SocketCreate { .. } => Status::SocketCreateError,
            ChannelError::OptionSet { .. } => Status::OptionSetError,
            ChannelError::Bind { .. } => Status::BindError,
            ChannelError::Listen(_) => Status::ListenError,
            ChannelError::NoConnect { .. } => Status::NoConnect,
            ChannelError::Accept(_) => Status::AcceptError,
            ChannelError::ConnectTimeout => Status::ConnectTimeout,
            ChannelError::InvalidHandle(_) => Status::InvalidHandle,
            ChannelError::NotSent(_) => Status::MessageNotSent,
            ChannelError::AckFailed(_) | ChannelError::Rejected => Status::AckRecvFail,
            ChannelError::Disconnected | ChannelError::Io(_) => Status::MessageNotRecvd,
            ChannelError::RecvTimeout => Status::MessageRecvTimeout,
            ChannelError::Overflow { .. } => Status::MessageOverflow,
        }
    }
}

pub type Result<T> = std::result::Result<T, ChannelError>;
