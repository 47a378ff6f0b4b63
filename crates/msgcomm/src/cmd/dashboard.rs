use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use msgcomm::actor::MessageWorker;
use msgcomm::grammar;
use tracing::{info, warn};

use crate::cmd::common::{
    install_ctrlc_handler, parse_duration, preflight_listener, start_worker, stop_worker,
    wait_for_drain, worker_config, POLL_INTERVAL,
};
use crate::cmd::DashboardArgs;
use crate::exit::{CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: DashboardArgs, format: OutputFormat) -> CliResult<i32> {
    let config = worker_config(&args.tuning)?;
    let grace = parse_duration(&args.grace)?;
    preflight_listener(args.listen_host.as_deref(), args.listen_port, &config)?;

    let results = MessageWorker::receiver(
        "dashboard-results",
        args.listen_host.as_deref(),
        args.listen_port,
        config.clone(),
    );
    let producer = MessageWorker::sender(
        "dashboard-producer-control",
        &args.producer_host,
        args.producer_port,
        config.clone(),
    );
    let consumer = MessageWorker::sender(
        "dashboard-consumer-control",
        &args.consumer_host,
        args.consumer_port,
        config,
    );

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;
    start_worker(&results)?;
    start_worker(&producer)?;
    start_worker(&consumer)?;

    let mut shown = 0usize;
    while running.load(Ordering::SeqCst) {
        let Some(message) = results.dequeue() else {
            thread::sleep(POLL_INTERVAL);
            continue;
        };

        if !grammar::is_message_type(&message.to_text(), grammar::CONSUMER_PROCESS_RESULTS) {
            info!(message = %message, "unexpected message on results channel");
            continue;
        }
        print_message(&message, results.name(), format);
        shown = shown.saturating_add(1);

        if args.count.is_some_and(|count| shown >= count) {
            break;
        }
    }

    info!(shown, "shutting down producer and consumer");
    producer.enqueue(grammar::SHUTDOWN);
    consumer.enqueue(grammar::SHUTDOWN);

    for control in [&producer, &consumer] {
        wait_for_drain(control, grace, None);
    }

    stop_worker(&producer)?;
    stop_worker(&consumer)?;
    stop_worker(&results)?;

    // A send still in flight leaves the queue empty, so count after join.
    let undelivered: Vec<&str> = [&producer, &consumer]
        .into_iter()
        .filter(|control| control.pending() > 0)
        .map(|control| control.name())
        .collect();

    if undelivered.is_empty() {
        return Ok(SUCCESS);
    }
    warn!(workers = ?undelivered, "shutdown not delivered");
    Err(CliError::new(
        FAILURE,
        format!("shutdown not delivered by {}", undelivered.join(", ")),
    ))
}
