//! Coordinator configuration.

use std::time::Duration;

/// Worker pool configuration.
///
/// Defaults carry the production tuning: 5 s stall samples with a
/// warning after 4 frozen samples and an abort after 8, and a 15 minute
/// overall ceiling.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Worker processes to spawn.
    pub worker_count: usize,

    /// Minimum owners a worker should hold before another worker is
    /// worth using.
    pub min_owners_per_worker: usize,

    /// How often to log the aggregate progress line.
    pub progress_interval: Duration,

    /// Stall sampling window.
    pub sample_interval: Duration,

    /// Frozen samples before a stall warning.
    pub stall_warn_samples: u32,

    /// Frozen samples before the job is aborted as stalled.
    pub stall_abort_samples: u32,

    /// Overall wall-clock ceiling for a job.
    pub job_timeout: Duration,

    /// Grace period between graceful terminate and force kill.
    pub shutdown_grace: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            min_owners_per_worker: 10,
            progress_interval: Duration::from_secs(3),
            sample_interval: Duration::from_secs(5),
            stall_warn_samples: 4,
            stall_abort_samples: 8,
            job_timeout: Duration::from_secs(15 * 60),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}
