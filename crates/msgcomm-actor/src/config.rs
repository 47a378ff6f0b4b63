use std::time::Duration;

use msgcomm_channel::ChannelConfig;

/// Tuning for a [`MessageWorker`](crate::MessageWorker).
#[derive(Debug, Clone)]
pub struct MessageWorkerConfig {
    /// Receiver: longest single accept wait before re-checking shutdown.
    /// `0` waits forever and makes shutdown wait for a peer. Default: 5s.
    pub accept_timeout_secs: u64,
    /// Read timeout (receiver) or write timeout (sender). Default: 5s.
    pub io_timeout_secs: u64,
    /// Largest accepted message, terminator included. Default: 1 KiB.
    pub max_message_len: usize,
    /// Pause before retrying a failed connect or bind. Default: 1s.
    pub backoff: Duration,
    /// Sender: pause between queue drain passes. Default: 100ms.
    pub send_interval: Duration,
    /// Framing options for the underlying connection.
    pub channel: ChannelConfig,
}

impl Default for MessageWorkerConfig {
    fn default() -> Self {
        Self {
            accept_timeout_secs: 5,
            io_timeout_secs: 5,
            max_message_len: 1024,
            backoff: Duration::from_secs(1),
            send_interval: Duration::from_millis(100),
            channel: ChannelConfig::default(),
        }
    }
}
