//! Lifetime counters of a worker pool
//!
//! Counters only grow. They are atomics so they can be read without taking
//! the queue lock; `last_id` is only advanced while the queue lock is held.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub(crate) struct Counters {
    last_id: AtomicU64,
    completed: AtomicU64,
    refused: AtomicU64,
}

impl Counters {
    /// Issue the next task id. Caller holds the queue lock.
    pub fn next_id(&self) -> u64 {
        self.last_id.fetch_add(1, Ordering::SeqCst)
    }

    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_refused(&self) {
        self.refused.fetch_add(1, Ordering::SeqCst);
    }

    /// Every issued id has either completed or been refused.
    pub fn is_quiescent(&self) -> bool {
        let completed = self.completed.load(Ordering::SeqCst);
        let refused = self.refused.load(Ordering::SeqCst);
        completed + refused == self.last_id.load(Ordering::SeqCst)
    }

    /// Outcomes are read before `last_id`, so every outcome counted has its
    /// id counted too.
    pub fn snapshot(&self, queued: usize) -> PoolStats {
        let completed = self.completed.load(Ordering::SeqCst);
        let refused = self.refused.load(Ordering::SeqCst);
        PoolStats {
            last_id: self.last_id.load(Ordering::SeqCst),
            completed,
            refused,
            queued,
        }
    }
}

/// Point-in-time view of a pool's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Next id to issue; equals the number of submissions so far
    pub last_id: u64,
    /// Tasks that ran (including ones whose work panicked)
    pub completed: u64,
    /// Submissions turned away without running
    pub refused: u64,
    /// Tasks waiting in the queue when the snapshot was taken
    pub queued: usize,
}

impl PoolStats {
    /// Tasks accepted but not finished yet (queued or running)
    pub fn in_flight(&self) -> u64 {
        self.last_id
            .saturating_sub(self.completed)
            .saturating_sub(self.refused)
    }
}
