//! Error type for simulation setup, result recording, and export.

use thiserror::Error;

use crate::types::TaskId;

#[derive(Debug, Error)]
pub enum SimError {
    /// A run was configured with a parameter it cannot execute.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("task {id} is outside the latency table (size {len})")]
    UnknownTask { id: TaskId, len: usize },

    /// Each latency slot is written exactly once.
    #[error("latency for task {0} was already recorded")]
    AlreadyRecorded(TaskId),

    /// Slots the failed workers never filled stay `None` in `latencies`.
    #[error("{panicked} of {workers} worker thread(s) panicked")]
    WorkerPanicked {
        panicked: usize,
        workers: usize,
        latencies: Vec<Option<u64>>,
    },

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("latency export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
