use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use msgcomm::actor::MessageWorker;
use msgcomm::grammar;
use tracing::{debug, info};

use crate::cmd::common::{
    install_ctrlc_handler, parse_duration, preflight_listener, shutdown_requested, start_worker,
    stop_worker, wait_for_drain, worker_config, DRAIN_GRACE,
};
use crate::cmd::ProducerArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::workload::{random_in_range, PRODUCER_BASE, PRODUCER_LOWER_ADD, PRODUCER_UPPER_ADD};

pub fn run(args: ProducerArgs) -> CliResult<i32> {
    let config = worker_config(&args.tuning)?;
    let interval = parse_duration(&args.interval)?;
    preflight_listener(args.listen_host.as_deref(), args.listen_port, &config)?;

    let control = MessageWorker::receiver(
        "producer-control",
        args.listen_host.as_deref(),
        args.listen_port,
        config.clone(),
    );
    let work = MessageWorker::sender(
        "producer-work",
        &args.consumer_host,
        args.consumer_port,
        config,
    );

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;
    start_worker(&control)?;
    start_worker(&work)?;

    let mut rng = fastrand::Rng::new();
    let mut produced = 0usize;
    while running.load(Ordering::SeqCst) {
        let number = random_in_range(&mut rng, PRODUCER_BASE, PRODUCER_LOWER_ADD, PRODUCER_UPPER_ADD);
        work.enqueue(grammar::compose(grammar::PRODUCER, number));
        produced += 1;
        debug!(number, produced, "work item queued");

        if shutdown_requested(&control) {
            info!("shutdown requested by control peer");
            break;
        }
        if args.cycles.is_some_and(|cycles| produced >= cycles) {
            wait_for_drain(&work, DRAIN_GRACE, Some(&running));
            break;
        }
        thread::sleep(interval);
    }

    info!(produced, "producer finished");
    stop_worker(&work)?;
    stop_worker(&control)?;
    Ok(SUCCESS)
}
