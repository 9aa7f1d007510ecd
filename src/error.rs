//! Error types for the probe core.
//!
//! Application-level paths (CLI, configuration) use `anyhow`; the worker,
//! channel and coordinator layers return [`PulseError`] so callers can tell
//! setup failures from worker failures.

use thiserror::Error;

/// Main error type for the aggregation core.
#[derive(Error, Debug)]
pub enum PulseError {
    #[error("Input source unavailable: {0}")]
    Input(String),

    #[error("Failed to set up aggregation channel: {0}")]
    ChannelSetup(String),

    #[error("Aggregation channel error: {0}")]
    Channel(String),

    #[error("Failed to spawn worker {worker}: {message}")]
    Spawn { worker: usize, message: String },

    #[error("Worker {worker} {reason}")]
    WorkerFailed { worker: usize, reason: String },

    #[error("Worker {worker} finished without delivering its aggregate")]
    MissingRecord { worker: usize },

    #[error("Worker {worker} delivered a truncated aggregate record ({got} bytes)")]
    TruncatedRecord { worker: usize, got: usize },

    #[error("Worker {worker} delivered more than one aggregate record")]
    DuplicateRecord { worker: usize },

    #[error("Probe setup failed: {0}")]
    Probe(String),

    #[error("Invalid partition: worker {worker_id} of {worker_count}")]
    InvalidPartition { worker_id: usize, worker_count: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, PulseError>;

impl PulseError {
    /// Build a channel setup error from the last OS error.
    pub(crate) fn setup_os(what: &str) -> Self {
        Self::ChannelSetup(format!("{}: {}", what, std::io::Error::last_os_error()))
    }
}
