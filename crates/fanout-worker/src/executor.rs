//! The action execution seam.
//!
//! The runtime never talks to the remote service itself; it hands each
//! assignment to an [`ActionExecutor`]. Deployments plug in an HTTP
//! client here, tests and dry runs plug in a simulator.

use std::sync::Arc;

use async_trait::async_trait;

use fanout_core::{ActionOutcome, ActionSpec, Owner};
use fanout_engine::retry::{CallFailure, RemoteAction};

/// Performs one action on behalf of one owner.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Perform `action` as `owner` against the given endpoint variant.
    ///
    /// Status failures drive the retry layer; a returned outcome is
    /// terminal whether or not its success predicate held.
    async fn execute(
        &self,
        owner: &Owner,
        action: &ActionSpec,
        endpoint: &str,
    ) -> Result<ActionOutcome, CallFailure>;
}

/// An executor bound to one owner and one action, shaped for the retry
/// layer.
pub(crate) struct BoundAction {
    pub executor: Arc<dyn ActionExecutor>,
    pub owner: Owner,
    pub action: ActionSpec,
}

#[async_trait]
impl RemoteAction for BoundAction {
    async fn call(&self, endpoint: &str) -> Result<ActionOutcome, CallFailure> {
        self.executor
            .execute(&self.owner, &self.action, endpoint)
            .await
    }
}
