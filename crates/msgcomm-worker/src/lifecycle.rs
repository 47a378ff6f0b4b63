use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{Result, WorkerError};
use crate::signal::ShutdownSignal;

/// Poll interval while `start` waits for the run checkpoint.
const START_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// The body a [`Worker`] runs on its thread.
pub trait Runnable: Send + 'static {
    /// Run until `shutdown` is requested.
    ///
    /// Blocking calls inside must be bounded so the signal is observed.
    fn main_loop(&mut self, shutdown: &ShutdownSignal);
}

/// Observable lifecycle position of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Idle,
    Starting,
    Running,
    ShutdownRequested,
    Joined,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Idle,
            1 => WorkerState::Starting,
            2 => WorkerState::Running,
            3 => WorkerState::ShutdownRequested,
            _ => WorkerState::Joined,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkerState::Idle => "idle",
            WorkerState::Starting => "starting",
            WorkerState::Running => "running",
            WorkerState::ShutdownRequested => "shutdown_requested",
            WorkerState::Joined => "joined",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Lifecycle<R> {
    body: Option<R>,
    handle: Option<JoinHandle<()>>,
}

/// Runs a [`Runnable`] on a dedicated, named thread.
///
/// `start`, `join` and drop are serialized by one lifecycle lock, so
/// concurrent callers cannot observe or corrupt a half-updated thread
/// handle. The state lives outside that lock, so `state()` never waits on
/// a blocking `join`. A worker runs at most once.
pub struct Worker<R: Runnable> {
    name: String,
    lifecycle: Mutex<Lifecycle<R>>,
    state: AtomicU8,
    shutdown: ShutdownSignal,
    running: Arc<AtomicBool>,
}

impl<R: Runnable> Worker<R> {
    pub fn new(name: impl Into<String>, body: R) -> Self {
        Self {
            name: name.into(),
            lifecycle: Mutex::new(Lifecycle {
                body: Some(body),
                handle: None,
            }),
            state: AtomicU8::new(WorkerState::Idle as u8),
            shutdown: ShutdownSignal::new(),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Spawn the worker thread.
    ///
    /// Returns `Ok(true)` once the thread has reached its run checkpoint,
    /// `Ok(false)` if the worker was already started (or has finished).
    pub fn start(&self) -> Result<bool> {
        let mut lifecycle = self.lock();
        let Some(mut body) = lifecycle.body.take() else {
            debug!(worker = %self.name, state = %self.state(), "start ignored");
            return Ok(false);
        };
        self.set_state(WorkerState::Starting);

        let running = Arc::clone(&self.running);
        let shutdown = self.shutdown.clone();
        let spawned = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                running.store(true, Ordering::SeqCst);
                body.main_loop(&shutdown);
                running.store(false, Ordering::SeqCst);
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(source) => {
                // The body went down with the closure; the worker cannot run.
                self.set_state(WorkerState::Joined);
                return Err(WorkerError::Spawn {
                    name: self.name.clone(),
                    source,
                });
            }
        };

        while !self.running.load(Ordering::SeqCst) && !handle.is_finished() {
            thread::sleep(START_POLL_INTERVAL);
        }

        lifecycle.handle = Some(handle);
        self.set_state(WorkerState::Running);
        info!(worker = %self.name, "worker started");
        Ok(true)
    }

    /// Set (or clear) the shutdown request seen by the body.
    pub fn signal_shutdown(&self, requested: bool) {
        self.shutdown.set(requested);
        if requested {
            debug!(worker = %self.name, "shutdown requested");
        }
    }

    /// Request shutdown and wait for the thread to exit.
    ///
    /// Returns immediately if the worker never started. Safe to call more
    /// than once; only the first call after a panic reports it.
    pub fn join(&self) -> Result<()> {
        let mut lifecycle = self.lock();
        let Some(handle) = lifecycle.handle.take() else {
            return Ok(());
        };

        self.signal_shutdown(true);
        let outcome = handle.join();
        self.set_state(WorkerState::Joined);
        self.running.store(false, Ordering::SeqCst);

        match outcome {
            Ok(()) => {
                info!(worker = %self.name, "worker joined");
                Ok(())
            }
            Err(payload) => Err(WorkerError::Panicked {
                name: self.name.clone(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }

    pub fn state(&self) -> WorkerState {
        let state = WorkerState::from_u8(self.state.load(Ordering::SeqCst));
        if state == WorkerState::Running && self.shutdown.is_requested() {
            WorkerState::ShutdownRequested
        } else {
            state
        }
    }

    /// True between the run checkpoint and the body returning.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_shutdown_signaled(&self) -> bool {
        self.shutdown.is_requested()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A clone of the signal the body observes.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle<R>> {
        self.lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R: Runnable> Drop for Worker<R> {
    fn drop(&mut self) {
        if let Err(err) = self.join() {
            warn!(worker = %self.name, error = %err, "worker ended abnormally");
        }
    }
}

impl<R: Runnable> fmt::Debug for Worker<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
