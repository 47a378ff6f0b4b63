use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use msgcomm::actor::MessageWorker;
use tracing::info;

use crate::cmd::common::{
    install_ctrlc_handler, parse_duration, start_worker, stop_worker, wait_for_drain,
    worker_config,
};
use crate::cmd::SendArgs;
use crate::exit::{CliError, CliResult, FAILURE, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_delivery, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    if args.count == 0 {
        return Err(CliError::new(USAGE, "--count must be at least 1"));
    }
    let timeout = parse_duration(&args.timeout)?;
    let config = worker_config(&args.tuning)?;
    if args.data.len() + 1 > config.max_message_len {
        return Err(CliError::new(
            USAGE,
            format!(
                "--data is {} bytes; --max-len {} allows at most {}",
                args.data.len(),
                config.max_message_len,
                config.max_message_len - 1
            ),
        ));
    }

    let sender = MessageWorker::sender("send", &args.host, args.port, config);
    for _ in 0..args.count {
        sender.enqueue(args.data.as_str());
    }

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;
    start_worker(&sender)?;

    let drained = wait_for_drain(&sender, timeout, Some(&running));
    stop_worker(&sender)?;

    let undelivered = sender.pending();
    let sent = args.count - undelivered;
    info!(sent, undelivered, "send finished");
    print_delivery(sender.name(), &args.host, args.port, sent, undelivered, format);

    if undelivered == 0 {
        return Ok(SUCCESS);
    }
    if !running.load(Ordering::SeqCst) {
        return Err(CliError::new(
            FAILURE,
            format!("interrupted with {undelivered} message(s) unsent"),
        ));
    }
    if !drained {
        return Err(CliError::new(
            TIMEOUT,
            format!(
                "timed out after {timeout:?}: {undelivered} of {} message(s) unsent to {}:{}",
                args.count, args.host, args.port
            ),
        ));
    }
    Err(CliError::new(
        FAILURE,
        format!("{undelivered} message(s) failed to send"),
    ))
}
