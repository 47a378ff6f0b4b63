/// Errors that can occur while driving a worker's lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// The OS refused to create the worker thread.
    #[error("failed to spawn worker thread {name}: {source}")]
    Spawn {
        name: String,
        source: std::io::Error,
    },

    /// The worker body panicked; the panic is contained at `join`.
    #[error("worker {name} panicked: {message}")]
    Panicked { name: String, message: String },
}

pub type Result<T> = std::result::Result<T, WorkerError>;
