//! Action kinds, specs, and outcomes.

use crate::OwnerId;
use serde::{Deserialize, Serialize};

/// The kind of remote action a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Publish a new post.
    Post,
    /// Comment on a target.
    Comment,
    /// Like a target.
    Like,
    /// Cross-like: one owner likes another owner's target.
    CrossLike,
    /// Answer a knowledge question.
    Know,
    /// Delete an owned post.
    Delete,
}

impl ActionKind {
    /// Stable lowercase name, used in logs and CLI arguments.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
            Self::Like => "like",
            Self::CrossLike => "cross_like",
            Self::Know => "know",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One concrete action to perform on behalf of an owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionSpec {
    /// Publish the n-th post of a batch for this owner.
    Post { index: u32 },

    /// Comment on the referenced target.
    Comment { target_ref: String },

    /// Like the referenced target.
    Like { target_ref: String },

    /// Like another owner's target (cross-assignment workloads).
    CrossLike {
        target_owner: OwnerId,
        target_ref: String,
    },

    /// Answer the referenced knowledge question.
    Know { target_ref: String },

    /// Delete the referenced owned post.
    Delete { target_ref: String },
}

impl ActionSpec {
    /// The kind of this action.
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Post { .. } => ActionKind::Post,
            Self::Comment { .. } => ActionKind::Comment,
            Self::Like { .. } => ActionKind::Like,
            Self::CrossLike { .. } => ActionKind::CrossLike,
            Self::Know { .. } => ActionKind::Know,
            Self::Delete { .. } => ActionKind::Delete,
        }
    }

    /// The remote reference this action touches, if any.
    pub fn target_ref(&self) -> Option<&str> {
        match self {
            Self::Post { .. } => None,
            Self::Comment { target_ref }
            | Self::Like { target_ref }
            | Self::CrossLike { target_ref, .. }
            | Self::Know { target_ref }
            | Self::Delete { target_ref } => Some(target_ref),
        }
    }
}

/// The terminal result of one action.
///
/// Failures are values, never errors: anything that goes wrong inside
/// an action is folded into `success: false` before it reaches the
/// queue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// Whether the domain success predicate held.
    pub success: bool,

    /// Side-channel artifact produced by the action (liked article id,
    /// deleted post id, ...). Collected by the caller.
    pub artifact: Option<String>,

    /// Error description for failed actions.
    pub error: Option<String>,
}

impl ActionOutcome {
    /// A successful outcome with no artifact.
    pub fn success() -> Self {
        Self {
            success: true,
            artifact: None,
            error: None,
        }
    }

    /// A successful outcome carrying an artifact id.
    pub fn success_with_artifact(artifact: impl Into<String>) -> Self {
        Self {
            success: true,
            artifact: Some(artifact.into()),
            error: None,
        }
    }

    /// A failed outcome with a reason.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            artifact: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_kind() {
        let spec = ActionSpec::CrossLike {
            target_owner: OwnerId::new("b"),
            target_ref: "post-1".into(),
        };
        assert_eq!(spec.kind(), ActionKind::CrossLike);
        assert_eq!(spec.target_ref(), Some("post-1"));
        assert_eq!(spec.kind().to_string(), "cross_like");
    }

    #[test]
    fn test_post_has_no_target() {
        assert_eq!(ActionSpec::Post { index: 3 }.target_ref(), None);
    }
}
