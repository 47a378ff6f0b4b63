use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod common;
pub mod consumer;
pub mod dashboard;
pub mod producer;
pub mod receive;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send messages to a receiver.
    Send(SendArgs),
    /// Listen and print received messages.
    Receive(ReceiveArgs),
    /// Generate work items for a consumer until told to shut down.
    Producer(ProducerArgs),
    /// Process producer work items and report results to a dashboard.
    Consumer(ConsumerArgs),
    /// Print consumer results, then shut producer and consumer down.
    Dashboard(DashboardArgs),
    /// Show version information.
    Version(VersionArgs),
}

impl Command {
    /// Program name carried by the root span.
    pub fn program_name(&self) -> &'static str {
        match self {
            Command::Send(_) => "msgcomm.send",
            Command::Receive(_) => "msgcomm.receive",
            Command::Producer(_) => "msgcomm.producer",
            Command::Consumer(_) => "msgcomm.consumer",
            Command::Dashboard(_) => "msgcomm.dashboard",
            Command::Version(_) => "msgcomm.version",
        }
    }
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Receive(args) => receive::run(args, format),
        Command::Producer(args) => producer::run(args),
        Command::Consumer(args) => consumer::run(args),
        Command::Dashboard(args) => dashboard::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Connection and retry tuning shared by every worker-backed command.
#[derive(Args, Debug, Clone)]
pub struct WorkerTuning {
    /// Seconds a single accept wait may block (0 = forever).
    #[arg(long, default_value_t = 5)]
    pub accept_timeout: u64,
    /// Seconds a read or write may block (0 = forever).
    #[arg(long, default_value_t = 5)]
    pub io_timeout: u64,
    /// Largest accepted message in bytes, terminator included.
    #[arg(long, default_value_t = 1024)]
    pub max_len: usize,
    /// Exchange a one-byte acknowledgement after every message.
    #[arg(long)]
    pub ack: bool,
    /// Pause before retrying a failed connect or bind (e.g. 1s, 250ms).
    #[arg(long, default_value = "1s")]
    pub backoff: String,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Receiver host name or address.
    #[arg(env = "MSGCOMM_HOST")]
    pub host: String,
    /// Receiver port.
    #[arg(env = "MSGCOMM_PORT")]
    pub port: u16,
    /// Message text.
    #[arg(long)]
    pub data: String,
    /// Number of copies to send.
    #[arg(long, default_value_t = 1)]
    pub count: usize,
    /// Give up if not everything is sent within this time (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    #[command(flatten)]
    pub tuning: WorkerTuning,
}

#[derive(Args, Debug)]
pub struct ReceiveArgs {
    /// Port to listen on.
    #[arg(env = "MSGCOMM_PORT")]
    pub port: u16,
    /// Interface to bind. Default: all interfaces.
    #[arg(long, env = "MSGCOMM_BIND_HOST")]
    pub host: Option<String>,
    /// Exit after printing N messages.
    #[arg(long)]
    pub count: Option<usize>,
    #[command(flatten)]
    pub tuning: WorkerTuning,
}

#[derive(Args, Debug)]
pub struct ProducerArgs {
    /// Interface for the control listener. Default: all interfaces.
    #[arg(long)]
    pub listen_host: Option<String>,
    /// Port for the control listener (receives `:SHUTDOWN:`).
    #[arg(long)]
    pub listen_port: u16,
    /// Consumer host.
    #[arg(long, default_value = "localhost")]
    pub consumer_host: String,
    /// Consumer work port.
    #[arg(long)]
    pub consumer_port: u16,
    /// Time between work items (e.g. 1s, 200ms).
    #[arg(long, default_value = "1s")]
    pub interval: String,
    /// Stop after producing N work items.
    #[arg(long)]
    pub cycles: Option<usize>,
    #[command(flatten)]
    pub tuning: WorkerTuning,
}

#[derive(Args, Debug)]
pub struct ConsumerArgs {
    /// Interface for both listeners. Default: all interfaces.
    #[arg(long)]
    pub listen_host: Option<String>,
    /// Port receiving producer work items.
    #[arg(long)]
    pub listen_port: u16,
    /// Port for the control listener (receives `:SHUTDOWN:`).
    #[arg(long)]
    pub control_port: u16,
    /// Dashboard host.
    #[arg(long, default_value = "localhost")]
    pub dashboard_host: String,
    /// Dashboard results port.
    #[arg(long)]
    pub dashboard_port: u16,
    #[command(flatten)]
    pub tuning: WorkerTuning,
}

#[derive(Args, Debug)]
pub struct DashboardArgs {
    /// Interface for the results listener. Default: all interfaces.
    #[arg(long)]
    pub listen_host: Option<String>,
    /// Port receiving consumer results.
    #[arg(long)]
    pub listen_port: u16,
    /// Producer host.
    #[arg(long, default_value = "localhost")]
    pub producer_host: String,
    /// Producer control port.
    #[arg(long)]
    pub producer_port: u16,
    /// Consumer host.
    #[arg(long, default_value = "localhost")]
    pub consumer_host: String,
    /// Consumer control port.
    #[arg(long)]
    pub consumer_port: u16,
    /// Shut everything down after N results.
    #[arg(long)]
    pub count: Option<usize>,
    /// How long to wait for shutdown messages to go out (e.g. 5s).
    #[arg(long, default_value = "5s")]
    pub grace: String,
    #[command(flatten)]
    pub tuning: WorkerTuning,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
