//! Progress bookkeeping flowing from workers up to the coordinator.

use crate::JobReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A progress delta reported by a worker.
///
/// Reports are additive: the coordinator merges them by summing fields
/// and concatenating artifacts, so arrival order never matters. Workers
/// reset their local counters after each report to avoid double
/// counting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    /// Actions that satisfied the success predicate.
    pub success: u64,

    /// Actions that terminally failed.
    pub failure: u64,

    /// Actions that reached a terminal state (success + failure).
    pub completed: u64,

    /// Total actions known to the reporter.
    pub total: u64,

    /// Side-channel artifact ids produced since the last report.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<String>,
}

impl ProgressReport {
    /// Merge another report into this one. Additive and commutative.
    pub fn merge(&mut self, other: &ProgressReport) {
        self.success += other.success;
        self.failure += other.failure;
        self.completed += other.completed;
        self.total += other.total;
        self.artifacts.extend(other.artifacts.iter().cloned());
    }

    /// Completion percentage, 0-100.
    pub fn percent(&self) -> u64 {
        if self.total == 0 {
            0
        } else {
            self.completed * 100 / self.total
        }
    }

    /// Whether every known action has reached a terminal state.
    pub fn is_done(&self) -> bool {
        self.total > 0 && self.completed >= self.total
    }
}

/// The terminal result of a job.
///
/// A job always ends with one of these, whatever went wrong along the
/// way: the reason distinguishes clean completion from stalls,
/// timeouts, and hard errors, and partial counts are preserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    /// Why the job ended.
    pub reason: JobReason,

    /// Aggregate counts at termination.
    pub progress: ProgressReport,

    /// Human-readable detail (stall/timeout/error description).
    pub message: String,

    /// When the job started.
    pub started_at: DateTime<Utc>,

    /// When the job reached a terminal state.
    pub finished_at: DateTime<Utc>,
}

impl JobResult {
    /// Wall-clock duration of the job in seconds.
    pub fn duration_secs(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}
