//! Handoff queue between the fetching driver and the processing workers.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use crate::types::Task;

/// Fetched tasks waiting for a worker, plus the "no more input" flag.
///
/// Both live under one lock so a worker can never see the flag set while a
/// push is still in flight.
pub struct TaskQueue {
    state: Mutex<Handoff>,
    ready: Condvar,
}

struct Handoff {
    pending: VecDeque<Task>,
    closed: bool,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Handoff {
                pending: VecDeque::new(),
                closed: false,
            }),
            ready: Condvar::new(),
        }
    }

    /// Queue a fetched task and wake one idle worker.
    ///
    /// After `close` the task is handed back as `Err`.
    pub fn push(&self, task: Task) -> Result<(), Task> {
        let mut handoff = self.state.lock().expect("task queue mutex poisoned");
        if handoff.closed {
            return Err(task);
        }
        handoff.pending.push_back(task);
        self.ready.notify_one();
        Ok(())
    }

    /// Take the oldest pending task, if any, without waiting.
    pub fn try_pop(&self) -> Option<Task> {
        let mut handoff = self.state.lock().expect("task queue mutex poisoned");
        handoff.pending.pop_front()
    }

    /// Worker side of the handoff.
    ///
    /// Returns the oldest pending task, sleeping while none is queued. `None`
    /// means the producer has closed the queue and nothing is left to drain.
    pub fn pop_blocking_or_closed(&self) -> Option<Task> {
        let handoff = self.state.lock().expect("task queue mutex poisoned");
        let mut handoff = self
            .ready
            .wait_while(handoff, |h| h.pending.is_empty() && !h.closed)
            .expect("task queue condvar wait failed");
        // Closed but non-empty still yields a task.
        handoff.pending.pop_front()
    }

    /// Producer side: no more tasks will arrive. Every sleeping worker wakes.
    pub fn close(&self) {
        let mut handoff = self.state.lock().expect("task queue mutex poisoned");
        handoff.closed = true;
        self.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().expect("task queue mutex poisoned").closed
    }

    /// Tasks fetched but not yet picked up.
    pub fn len(&self) -> usize {
        self.state.lock().expect("task queue mutex poisoned").pending.len()
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
