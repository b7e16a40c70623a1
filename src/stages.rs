//! Fetch and process stages with pluggable simulated work.

use std::thread;
use std::time::Duration;

use crate::console::Console;
use crate::latency::LatencyTable;
use crate::log_dev;
use crate::types::{Task, TaskId};

/// Stand-in for the blocking part of a stage.
pub trait Delay: Send + Sync {
    fn pause(&self);
}

/// Blocks the calling thread for a fixed duration.
#[derive(Clone, Copy, Debug)]
pub struct SleepDelay(pub Duration);

impl Delay for SleepDelay {
    fn pause(&self) {
        if !self.0.is_zero() {
            thread::sleep(self.0);
        }
    }
}

/// Returns immediately; keeps tests off the wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDelay;

impl Delay for NoDelay {
    fn pause(&self) {}
}

/// The pair of delays a run uses for its two stages.
pub struct Stages {
    pub fetch: Box<dyn Delay>,
    pub process: Box<dyn Delay>,
}

fn delay_for(duration: Duration) -> Box<dyn Delay> {
    if duration.is_zero() {
        Box::new(NoDelay)
    } else {
        Box::new(SleepDelay(duration))
    }
}

impl Stages {
    pub fn sleeping(fetch: Duration, process: Duration) -> Self {
        Self {
            fetch: delay_for(fetch),
            process: delay_for(process),
        }
    }

    #[cfg(test)]
    pub fn instant() -> Self {
        Self {
            fetch: Box::new(NoDelay),
            process: Box::new(NoDelay),
        }
    }
}

/// Simulate acquiring task `id`; the task is stamped once the delay ends.
pub fn fetch_task(id: TaskId, delay: &dyn Delay) -> Task {
    delay.pause();
    Task::fetched(id)
}

/// Simulate working on `task`, then record and print its latency.
pub fn process_task(
    task: Task,
    delay: &dyn Delay,
    latencies: &LatencyTable,
    console: &Console,
) -> u64 {
    delay.pause();
    let latency_ms = task.fetch_time.elapsed().as_millis() as u64;
    if let Err(err) = latencies.record(task.id, latency_ms) {
        // Only reachable if a task id is reused within a run.
        log_dev!("[WORKER] dropping latency for task {}: {err}", task.id);
    }
    console.line(format!("Task {} latency: {latency_ms} ms", task.id));
    latency_ms
}
