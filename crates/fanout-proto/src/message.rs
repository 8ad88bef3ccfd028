//! Tagged-union messages exchanged between coordinator and workers.

use crate::shard::WorkerShard;
use fanout_core::{ProgressReport, WorkerId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Protocol violations detected when validating messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// An assignment references an owner the shard does not carry.
    #[error("Assignment references unknown owner: {0}")]
    UnknownOwner(String),

    /// A cross action targets its own source owner.
    #[error("Self-assignment for owner: {0}")]
    SelfAssignment(String),

    /// A progress report with inconsistent counters.
    #[error("Inconsistent progress report: {0}")]
    InconsistentProgress(String),

    /// Message could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Messages sent from the coordinator down to a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum CoordinatorMessage {
    /// Assign a shard of work. An empty shard means "idle this job".
    Shard(WorkerShard),

    /// Stop enqueueing, let in-flight work finish within the grace
    /// window, then exit.
    Terminate { grace_ms: u64 },
}

impl CoordinatorMessage {
    /// Validate before send / after receive.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            Self::Shard(shard) => shard.validate(),
            Self::Terminate { .. } => Ok(()),
        }
    }
}

/// Messages sent from a worker up to the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum WorkerMessage {
    /// Periodic additive progress delta.
    Progress(ProgressReport),

    /// The worker drained its shard.
    Complete(CompletionNotice),

    /// A fault report. Whether the worker survives it shows up as a
    /// separate exit event.
    Error(WorkerFault),
}

impl WorkerMessage {
    /// Validate before send / after receive.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            Self::Progress(report) => {
                if report.completed != report.success + report.failure {
                    return Err(ProtocolError::InconsistentProgress(format!(
                        "completed {} != success {} + failure {}",
                        report.completed, report.success, report.failure
                    )));
                }
                Ok(())
            }
            Self::Complete(_) | Self::Error(_) => Ok(()),
        }
    }
}

/// Final shard summary sent when a worker finishes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionNotice {
    /// Actions the worker processed in total.
    pub processed: u64,
}

/// A fault report from a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerFault {
    /// Description of what failed.
    pub error: String,
}

/// A worker-to-coordinator event as seen on the aggregation channel:
/// the message plus which worker sent it, or an exit notice from the
/// transport.
#[derive(Debug)]
pub enum WorkerEvent {
    /// A protocol message from a live worker.
    Message {
        worker_id: WorkerId,
        message: WorkerMessage,
    },

    /// The worker's process/task ended. `clean` distinguishes a normal
    /// exit from a crash.
    Exited { worker_id: WorkerId, clean: bool },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_tags() {
        let msg = CoordinatorMessage::Terminate { grace_ms: 5000 };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"terminate""#));

        let msg = WorkerMessage::Complete(CompletionNotice { processed: 7 });
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"complete""#));
    }

    #[test]
    fn test_progress_validation() {
        let ok = WorkerMessage::Progress(ProgressReport {
            success: 2,
            failure: 1,
            completed: 3,
            total: 10,
            artifacts: vec![],
        });
        assert!(ok.validate().is_ok());

        let bad = WorkerMessage::Progress(ProgressReport {
            success: 2,
            failure: 2,
            completed: 3,
            total: 10,
            artifacts: vec![],
        });
        assert!(matches!(
            bad.validate(),
            Err(ProtocolError::InconsistentProgress(_))
        ));
    }
}
