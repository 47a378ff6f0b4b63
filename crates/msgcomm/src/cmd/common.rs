use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use msgcomm::actor::{MessageWorker, MessageWorkerConfig};
use msgcomm::channel::{timeout_from_secs, ChannelConfig, ConnectionHandle};
use msgcomm::grammar;
use tracing::{debug, info, warn};

use crate::cmd::WorkerTuning;
use crate::exit::{channel_error, worker_error, CliError, CliResult, INTERNAL, USAGE};

/// How often command loops poll worker queues.
pub const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long a command waits for its senders to empty before stopping.
pub const DRAIN_GRACE: Duration = Duration::from_secs(2);

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

/// Validate tuning flags and build a worker configuration.
pub fn worker_config(tuning: &WorkerTuning) -> CliResult<MessageWorkerConfig> {
    timeout_from_secs("accept", tuning.accept_timeout)
        .and_then(|_| timeout_from_secs("io", tuning.io_timeout))
        .map_err(|err| channel_error("invalid timeout", &err))?;
    if tuning.max_len < 2 {
        return Err(CliError::new(USAGE, "--max-len must be at least 2"));
    }

    Ok(MessageWorkerConfig {
        accept_timeout_secs: tuning.accept_timeout,
        io_timeout_secs: tuning.io_timeout,
        max_message_len: tuning.max_len,
        backoff: parse_duration(&tuning.backoff)?,
        channel: ChannelConfig {
            await_ack: tuning.ack,
            ..ChannelConfig::default()
        },
        ..MessageWorkerConfig::default()
    })
}

/// Bind once up front so a bad port fails the command instead of being
/// retried forever by the receiver worker.
pub fn preflight_listener(
    host: Option<&str>,
    port: u16,
    config: &MessageWorkerConfig,
) -> CliResult<()> {
    let mut listener = ConnectionHandle::open_for_recv(
        host,
        port,
        config.accept_timeout_secs,
        config.io_timeout_secs,
    );
    if let Some(err) = listener.setup_error() {
        return Err(channel_error("listener setup failed", err));
    }
    debug!(port, "listener preflight ok");
    listener.close();
    Ok(())
}

pub fn start_worker(worker: &MessageWorker) -> CliResult<()> {
    worker
        .start()
        .map(|_| ())
        .map_err(|err| worker_error("worker start failed", err))
}

/// Signal shutdown, wait for the thread and report a panic as an error.
pub fn stop_worker(worker: &MessageWorker) -> CliResult<()> {
    worker
        .join()
        .map_err(|err| worker_error("worker stopped abnormally", err))
}

/// Wait until `worker` has no pending messages.
///
/// Returns `false` on timeout, or early if `running` is cleared.
pub fn wait_for_drain(
    worker: &MessageWorker,
    timeout: Duration,
    running: Option<&AtomicBool>,
) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if worker.pending() == 0 {
            return true;
        }
        if Instant::now() >= deadline {
            warn!(worker = %worker.name(), pending = worker.pending(), "messages still queued");
            return false;
        }
        if running.is_some_and(|running| !running.load(Ordering::SeqCst)) {
            return false;
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Drain a control queue; true once `:SHUTDOWN:` has arrived.
pub fn shutdown_requested(control: &MessageWorker) -> bool {
    while let Some(message) = control.dequeue() {
        let text = message.to_text();
        if grammar::is_message_type(&text, grammar::SHUTDOWN) {
            return true;
        }
        info!(message = %text, "unrecognized control message");
    }
    false
}

pub fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
