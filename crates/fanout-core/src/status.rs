//! Status enums for the pool, its workers, and job termination.

use serde::{Deserialize, Serialize};

/// Lifecycle phase of the worker pool.
///
/// `Idle -> Initializing -> Distributing -> Running ->
/// {Completed | Stalled | TimedOut | Errored} -> ShuttingDown ->
/// Terminated`. Terminal reasons always converge through
/// `ShuttingDown`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoolPhase {
    /// No job started yet.
    #[default]
    Idle,
    /// Workers are being spawned.
    Initializing,
    /// Shards are being computed and sent.
    Distributing,
    /// Workers are executing their shards.
    Running,
    /// All work reached a terminal state.
    Completed,
    /// Progress froze past the abort threshold.
    Stalled,
    /// The wall-clock ceiling was hit.
    TimedOut,
    /// Distribution or transport failed.
    Errored,
    /// Terminate sent, waiting out the grace period.
    ShuttingDown,
    /// All workers gone.
    Terminated,
}

impl PoolPhase {
    /// Returns true once a terminal reason has been reached.
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            Self::Completed
                | Self::Stalled
                | Self::TimedOut
                | Self::Errored
                | Self::ShuttingDown
                | Self::Terminated
        )
    }
}

/// Why a job terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobReason {
    /// Every action reached a terminal state.
    Completed,
    /// Progress did not advance for the configured window.
    Stalled,
    /// The overall wall-clock ceiling expired.
    TimedOut,
    /// A non-recoverable setup or transport error.
    Error,
}

impl JobReason {
    /// Matching terminal pool phase.
    pub fn phase(&self) -> PoolPhase {
        match self {
            Self::Completed => PoolPhase::Completed,
            Self::Stalled => PoolPhase::Stalled,
            Self::TimedOut => PoolPhase::TimedOut,
            Self::Error => PoolPhase::Errored,
        }
    }
}

impl std::fmt::Display for JobReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Completed => "completed",
            Self::Stalled => "stalled",
            Self::TimedOut => "timed_out",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Coordinator-side view of one worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerState {
    /// Spawned, no shard assigned (or an explicitly empty one).
    #[default]
    Idle,
    /// Executing a shard.
    Busy,
    /// Reported completion of its shard.
    Completed,
    /// Exited; may be respawned.
    Exited,
}

impl WorkerState {
    /// Whether this worker still owes the coordinator work.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Busy)
    }
}
