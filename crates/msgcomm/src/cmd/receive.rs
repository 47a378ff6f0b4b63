use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use msgcomm::actor::MessageWorker;
use tracing::info;

use crate::cmd::common::{
    install_ctrlc_handler, preflight_listener, start_worker, stop_worker, worker_config,
    POLL_INTERVAL,
};
use crate::cmd::ReceiveArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: ReceiveArgs, format: OutputFormat) -> CliResult<i32> {
    let config = worker_config(&args.tuning)?;
    preflight_listener(args.host.as_deref(), args.port, &config)?;

    let receiver = MessageWorker::receiver("receive", args.host.as_deref(), args.port, config);
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;
    start_worker(&receiver)?;

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        let Some(message) = receiver.dequeue() else {
            thread::sleep(POLL_INTERVAL);
            continue;
        };

        print_message(&message, receiver.name(), format);
        printed = printed.saturating_add(1);

        if args.count.is_some_and(|count| printed >= count) {
            break;
        }
    }

    info!(printed, "receive finished");
    stop_worker(&receiver)?;
    Ok(SUCCESS)
}
