//! Coordinator-side bookkeeping for workers and the running job.

use chrono::{DateTime, Utc};
use serde::Serialize;

use fanout_core::{PoolPhase, ProgressReport, WorkerState};

use crate::transport::WorkerHandle;

/// Per-worker bookkeeping held by the pool.
pub struct WorkerSlot {
    /// Handle for sending messages / killing.
    pub handle: Box<dyn WorkerHandle>,

    /// Coordinator-side view of the worker.
    pub state: WorkerState,

    /// Cumulative progress merged from this worker's reports.
    pub progress: ProgressReport,

    /// Actions assigned to this worker.
    pub assigned: u64,

    /// Times this slot was (re)spawned.
    pub spawn_count: u32,

    /// When the last message from this worker arrived.
    pub last_update: DateTime<Utc>,
}

impl WorkerSlot {
    /// Wrap a freshly spawned handle.
    pub fn new(handle: Box<dyn WorkerHandle>) -> Self {
        Self {
            handle,
            state: WorkerState::Idle,
            progress: ProgressReport::default(),
            assigned: 0,
            spawn_count: 1,
            last_update: Utc::now(),
        }
    }

    /// Replace the handle after a respawn, keeping merged progress.
    pub fn respawned(&mut self, handle: Box<dyn WorkerHandle>) {
        self.handle = handle;
        self.state = WorkerState::Idle;
        self.spawn_count += 1;
        self.last_update = Utc::now();
    }
}

/// Point-in-time view of the pool, readable while a job runs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PoolSnapshot {
    /// Current lifecycle phase.
    pub phase: PoolPhase,

    /// Aggregate progress across all workers.
    pub progress: ProgressReport,

    /// Workers currently executing a shard.
    pub busy_workers: usize,

    /// Workers in the pool.
    pub total_workers: usize,
}
