//! Fixed-capacity bookkeeping for admitted tasks.
//!
//! Admitted tasks live in one of two places: a FIFO ring of pending tasks,
//! and an unordered active zone holding claimed tasks that are running or
//! finished and awaiting reclaim. Admission, claim, and removal are all O(1).
//! Both zones are preallocated at pool capacity, so steady-state operation
//! never grows them.

use std::collections::VecDeque;
use std::sync::Arc;

use super::task::TaskCore;

pub(crate) struct SlotTable {
    capacity: usize,
    pending: VecDeque<Arc<TaskCore>>,
    active: Vec<Arc<TaskCore>>,
    running: usize,
}

impl SlotTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            pending: VecDeque::with_capacity(capacity),
            active: Vec::with_capacity(capacity),
            running: 0,
        }
    }

    pub fn admitted(&self) -> usize {
        self.pending.len() + self.active.len()
    }

    pub fn is_full(&self) -> bool {
        self.admitted() >= self.capacity
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn running_count(&self) -> usize {
        self.running
    }

    pub fn reclaimable_count(&self) -> usize {
        self.active.len() - self.running
    }

    /// Append a newly admitted task to the back of the pending ring.
    pub fn push_pending(&mut self, task: Arc<TaskCore>) {
        debug_assert!(!self.is_full());
        self.pending.push_back(task);
    }

    /// Undo the most recent admission (submission rollback).
    pub fn pop_pending(&mut self) -> Option<Arc<TaskCore>> {
        self.pending.pop_back()
    }

    /// Claim the oldest pending task into the active zone. Returns the task
    /// and the slot index it now occupies.
    pub fn claim(&mut self) -> Option<(Arc<TaskCore>, usize)> {
        let task = self.pending.pop_front()?;
        self.active.push(Arc::clone(&task));
        self.running += 1;
        Some((task, self.active.len() - 1))
    }

    /// A running task published its result; it stays in the active zone
    /// until a reclaimer removes it.
    pub fn mark_finished(&mut self) {
        debug_assert!(self.running > 0);
        self.running -= 1;
    }

    /// Remove a task from the active zone by swap-removal. The task that got
    /// swapped into the vacated slot has its stored index patched; the caller
    /// must hold the pool lock so the patch cannot race another removal.
    pub fn remove(&mut self, slot: usize) -> Arc<TaskCore> {
        let removed = self.active.swap_remove(slot);
        if let Some(moved) = self.active.get(slot) {
            moved.inner.lock().slot = slot;
        }
        removed
    }
}
