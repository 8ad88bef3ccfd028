//! Shard payloads: the slice of work sent to one worker.

use crate::message::ProtocolError;
use fanout_core::{ActionSpec, Owner, OwnerId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One unit of work: an action bound to the owner performing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// Owner performing the action.
    pub owner: OwnerId,

    /// The action to perform.
    pub action: ActionSpec,
}

impl Assignment {
    /// Create a new Assignment.
    pub fn new(owner: impl Into<OwnerId>, action: ActionSpec) -> Self {
        Self {
            owner: owner.into(),
            action,
        }
    }
}

/// The slice of owners and assignments handed to one worker.
///
/// Created by the coordinator at distribution time, consumed once by a
/// worker runtime, never mutated afterward. An explicitly empty shard
/// tells a surplus worker it has nothing to do this job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerShard {
    /// Owners this worker holds capability handles for.
    pub owners: Vec<Owner>,

    /// Work items, each referencing an owner in `owners`.
    pub assignments: Vec<Assignment>,
}

impl WorkerShard {
    /// Create a shard from owners and assignments.
    pub fn new(owners: Vec<Owner>, assignments: Vec<Assignment>) -> Self {
        Self {
            owners,
            assignments,
        }
    }

    /// An explicitly empty shard.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether this shard carries no work.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Number of work items.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Validate shard invariants. Run by the coordinator before sending
    /// and by the worker after receiving.
    ///
    /// - every assignment's owner must appear in `owners`
    /// - cross-like actions must not target their own source owner
    pub fn validate(&self) -> Result<(), ProtocolError> {
        let known: HashSet<&OwnerId> = self.owners.iter().map(|o| &o.id).collect();

        for assignment in &self.assignments {
            if !known.contains(&assignment.owner) {
                return Err(ProtocolError::UnknownOwner(assignment.owner.to_string()));
            }
            if let ActionSpec::CrossLike { target_owner, .. } = &assignment.action {
                if target_owner == &assignment.owner {
                    return Err(ProtocolError::SelfAssignment(assignment.owner.to_string()));
                }
            }
        }
        Ok(())
    }
}
