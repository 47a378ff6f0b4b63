use std::fmt;
use std::io;

use msgcomm::channel::ChannelError;
use msgcomm::worker::WorkerError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: &io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn channel_error(context: &str, err: &ChannelError) -> CliError {
    match err {
        ChannelError::Bind { source, .. } | ChannelError::SocketCreate { source, .. } => {
            io_error(&format!("{context}: {err}"), source)
        }
        ChannelError::IllegalTimeout { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        ChannelError::Overflow { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        ChannelError::RecvTimeout | ChannelError::ConnectTimeout => {
            CliError::new(TIMEOUT, format!("{context}: {err}"))
        }
        ChannelError::Disconnected
        | ChannelError::NotSent(_)
        | ChannelError::AckFailed(_)
        | ChannelError::Rejected => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        ChannelError::InvalidHandle(_) => CliError::new(INTERNAL, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn worker_error(context: &str, err: WorkerError) -> CliError {
    CliError::new(INTERNAL, format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_is_data_invalid() {
        let err = channel_error("receive", &ChannelError::Overflow { needed: 9, max: 8 });
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.starts_with("receive: "));
    }

    #[test]
    fn bind_permission_maps_through_io_kind() {
        let err = ChannelError::Bind {
            addr: "0.0.0.0:80".to_string(),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert_eq!(channel_error("listen", &err).code, PERMISSION_DENIED);

        let err = ChannelError::Bind {
            addr: "0.0.0.0:80".to_string(),
            source: io::Error::from(io::ErrorKind::AddrInUse),
        };
        assert_eq!(channel_error("listen", &err).code, TRANSPORT_ERROR);
    }

    #[test]
    fn illegal_timeout_is_usage() {
        let err = ChannelError::IllegalTimeout {
            name: "read",
            secs: 90_000,
            max: 86_400,
        };
        assert_eq!(channel_error("setup", &err).code, USAGE);
    }
}
