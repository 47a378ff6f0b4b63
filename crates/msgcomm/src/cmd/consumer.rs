use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use msgcomm::actor::MessageWorker;
use msgcomm::grammar;
use tracing::{debug, info};

use crate::cmd::common::{
    install_ctrlc_handler, preflight_listener, shutdown_requested, start_worker, stop_worker,
    wait_for_drain, worker_config, DRAIN_GRACE, POLL_INTERVAL,
};
use crate::cmd::ConsumerArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::workload::divisor_summary;

pub fn run(args: ConsumerArgs) -> CliResult<i32> {
    let config = worker_config(&args.tuning)?;
    let host = args.listen_host.as_deref();
    preflight_listener(host, args.listen_port, &config)?;
    preflight_listener(host, args.control_port, &config)?;

    let work = MessageWorker::receiver("consumer-work", host, args.listen_port, config.clone());
    let control =
        MessageWorker::receiver("consumer-control", host, args.control_port, config.clone());
    let results = MessageWorker::sender(
        "consumer-results",
        &args.dashboard_host,
        args.dashboard_port,
        config,
    );

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;
    start_worker(&work)?;
    start_worker(&control)?;
    start_worker(&results)?;

    let mut processed = 0usize;
    while running.load(Ordering::SeqCst) {
        if shutdown_requested(&control) {
            info!("shutdown requested by control peer");
            break;
        }

        let Some(message) = work.dequeue() else {
            thread::sleep(POLL_INTERVAL);
            continue;
        };

        let text = message.to_text();
        if grammar::is_message_type(&text, grammar::SHUTDOWN) {
            info!("shutdown received on work channel");
            break;
        }
        match process(&text) {
            Some(result) => {
                results.enqueue(result);
                processed += 1;
                debug!(processed, "work item processed");
            }
            None => info!(message = %text, "unrecognized work message"),
        }
    }

    wait_for_drain(&results, DRAIN_GRACE, None);
    info!(processed, "consumer finished");
    stop_worker(&results)?;
    stop_worker(&control)?;
    stop_worker(&work)?;
    Ok(SUCCESS)
}

/// Turn a `:PRODUCER:<n>` item into a `:CONSUMER_PROCESS_RESULTS:` reply.
fn process(text: &str) -> Option<String> {
    let number: u32 = grammar::message_content(text, grammar::PRODUCER)?
        .trim()
        .parse()
        .ok()?;
    Some(grammar::compose(
        grammar::CONSUMER_PROCESS_RESULTS,
        divisor_summary(number),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn producer_item_becomes_result() {
        let reply = process(":PRODUCER:5").unwrap();
        assert!(reply.starts_with(grammar::CONSUMER_PROCESS_RESULTS));
        assert!(reply.ends_with("evenly divided by 8 different values."));
    }

    #[test]
    fn other_messages_are_not_processed() {
        assert!(process(":PRODUCER:").is_none());
        assert!(process(":PRODUCER:abc").is_none());
        assert!(process(":CONTROL:5").is_none());
    }
}
