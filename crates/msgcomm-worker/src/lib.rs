//! Lifecycle engine for blocking loops run on a dedicated thread.
//!
//! A [`Worker`] owns a [`Runnable`] body. `start` spawns a named thread and
//! does not return until that thread has reached its run checkpoint.
//! Shutdown is cooperative: the body polls its [`ShutdownSignal`], and
//! blocking calls inside the body are bounded by timeouts so the flag is
//! re-checked.

pub mod error;
pub mod lifecycle;
pub mod signal;

pub use error::{Result, WorkerError};
pub use lifecycle::{Runnable, Worker, WorkerState};
pub use signal::ShutdownSignal;
