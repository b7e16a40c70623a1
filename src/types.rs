//! Task model shared by the fetch and process stages.

use std::time::Instant;

/// Identifier of a task within one run, assigned `0..task_count` in fetch order.
pub type TaskId = u64;

/// Unit of work handed from the fetch stage to the worker pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Task {
    /// Position of the task in fetch order.
    pub id: TaskId,
    /// Instant at which the fetch stage finished producing this task.
    pub fetch_time: Instant,
}

impl Task {
    /// Stamp a task as fetched right now.
    pub fn fetched(id: TaskId) -> Self {
        Self {
            id,
            fetch_time: Instant::now(),
        }
    }
}
