//! Per-task latency table filled in by the worker pool.

use std::sync::OnceLock;

use crate::error::SimError;
use crate::types::TaskId;

/// Fixed-size table of fetch-to-completion latencies in milliseconds.
///
/// Sized at run start; every slot accepts exactly one write.
pub struct LatencyTable {
    slots: Vec<OnceLock<u64>>,
}

impl LatencyTable {
    pub fn new(task_count: usize) -> Self {
        Self {
            slots: (0..task_count).map(|_| OnceLock::new()).collect(),
        }
    }

    /// Store the latency for `id`; a second write to the same slot is rejected.
    pub fn record(&self, id: TaskId, latency_ms: u64) -> Result<(), SimError> {
        let len = self.slots.len();
        let slot = usize::try_from(id)
            .ok()
            .and_then(|index| self.slots.get(index))
            .ok_or(SimError::UnknownTask { id, len })?;
        slot.set(latency_ms).map_err(|_| SimError::AlreadyRecorded(id))
    }

    #[cfg(test)]
    pub fn get(&self, id: TaskId) -> Option<u64> {
        let index = usize::try_from(id).ok()?;
        self.slots.get(index).and_then(|slot| slot.get().copied())
    }

    /// True once every task has a recorded latency.
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(|slot| slot.get().is_some())
    }

    /// Ids whose latency was never recorded.
    pub fn missing(&self) -> Vec<TaskId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.get().is_none())
            .map(|(index, _)| index as TaskId)
            .collect()
    }

    pub fn snapshot(&self) -> Vec<Option<u64>> {
        self.slots.iter().map(|slot| slot.get().copied()).collect()
    }

    /// Arithmetic mean over recorded slots, 0.0 when nothing was recorded.
    pub fn mean(&self) -> f64 {
        let recorded: Vec<u64> = self.slots.iter().filter_map(|slot| slot.get().copied()).collect();
        if recorded.is_empty() {
            return 0.0;
        }
        recorded.iter().sum::<u64>() as f64 / recorded.len() as f64
    }
}
