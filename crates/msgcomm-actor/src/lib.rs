//! Message workers: a queue on one side, a framed TCP connection on the other.
//!
//! A sender drains its queue onto the wire; a receiver accepts a peer and
//! fills its queue. Both run on their own thread, retry setup failures
//! with a fixed backoff, and stop cooperatively.

pub mod config;
mod endpoint;
pub mod message_worker;

pub use config::MessageWorkerConfig;
pub use message_worker::{MessageWorker, Role};
pub use msgcomm_worker::{WorkerError, WorkerState};
