//! Retrying wrapper for a single remote action.
//!
//! The remote call itself is a collaborator behind [`RemoteAction`];
//! this module only decides whether and when to try again. Nothing
//! escapes as an error: every path folds into an [`ActionOutcome`].

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use fanout_core::ActionOutcome;

/// HTTP-equivalent status for rate limiting.
pub const STATUS_RATE_LIMITED: u16 = 429;

/// HTTP-equivalent status for an unstable upstream path.
pub const STATUS_NOT_FOUND: u16 = 404;

/// Why a remote call failed before the success predicate could be
/// evaluated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallFailure {
    /// The remote answered with an error status.
    #[error("remote status {0}")]
    Status(u16),

    /// The call never completed (connection error, malformed response).
    #[error("transport failure: {0}")]
    Transport(String),
}

/// A single idempotent-enough remote operation.
///
/// Implementations evaluate the domain success predicate themselves and
/// return `Ok` with the outcome; they return `Err` only when the call
/// failed at the protocol level and the status should drive retry
/// classification.
#[async_trait]
pub trait RemoteAction: Send + Sync {
    /// Perform the call against the given endpoint variant.
    async fn call(&self, endpoint: &str) -> Result<ActionOutcome, CallFailure>;
}

/// Retry tuning knobs.
///
/// Defaults mirror the production tuning: two extra attempts, linear
/// 3 s backoff, a fixed 10 s penalty on 429, and the usual transient
/// status set.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Extra attempts after the first.
    pub max_retries: u32,

    /// Linear backoff base: wait `base_delay * attempt` before retry
    /// `attempt`.
    pub base_delay: Duration,

    /// Fixed, longer wait after a 429.
    pub rate_limit_delay: Duration,

    /// Statuses worth retrying.
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(3),
            rate_limit_delay: Duration::from_secs(10),
            retryable_statuses: vec![404, 429, 500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    /// Whether a status is worth another attempt.
    pub fn is_retryable(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    /// Delay before retry number `attempt` (1-based) after `status`.
    pub fn delay_for(&self, status: u16, attempt: u32) -> Duration {
        if status == STATUS_RATE_LIMITED {
            self.rate_limit_delay
        } else {
            self.base_delay * attempt
        }
    }
}

/// Executes a [`RemoteAction`] with bounded retries and
/// endpoint-variant rotation.
///
/// On 404 the next attempt moves to the next endpoint variant, which
/// papers over upstream path instability; other retryable statuses keep
/// the current variant.
pub struct RetryingAction {
    policy: RetryPolicy,
    endpoints: Vec<String>,
}

impl RetryingAction {
    /// Create with a policy and a non-empty list of endpoint variants.
    pub fn new(policy: RetryPolicy, endpoints: Vec<String>) -> Self {
        debug_assert!(!endpoints.is_empty());
        let endpoints = if endpoints.is_empty() {
            vec![String::new()]
        } else {
            endpoints
        };
        Self { policy, endpoints }
    }

    /// Create with default policy and a single endpoint.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self::new(RetryPolicy::default(), vec![endpoint.into()])
    }

    /// Run the action to a terminal outcome. Never returns an error.
    pub async fn run(&self, action: &dyn RemoteAction) -> ActionOutcome {
        let mut endpoint_idx = 0usize;
        let mut last_failure: Option<CallFailure> = None;

        for attempt in 0..=self.policy.max_retries {
            let endpoint = &self.endpoints[endpoint_idx];
            if attempt > 0 {
                debug!(attempt, max = self.policy.max_retries, endpoint = %endpoint, "Retrying remote action");
            }

            match action.call(endpoint).await {
                Ok(outcome) => return outcome,
                Err(CallFailure::Status(status)) if self.policy.is_retryable(status) => {
                    last_failure = Some(CallFailure::Status(status));
                    if attempt == self.policy.max_retries {
                        break;
                    }

                    if status == STATUS_NOT_FOUND {
                        endpoint_idx = (endpoint_idx + 1) % self.endpoints.len();
                    }
                    let delay = self.policy.delay_for(status, attempt + 1);
                    warn!(status, delay_ms = delay.as_millis() as u64, "Transient remote failure, backing off");
                    tokio::time::sleep(delay).await;
                }
                Err(failure) => {
                    debug!(failure = %failure, "Non-retryable remote failure");
                    return ActionOutcome::failure(failure.to_string());
                }
            }
        }

        let detail = last_failure
            .map(|f| f.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        ActionOutcome::failure(format!("retries exhausted: {detail}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Plays back a canned sequence of responses, recording the
    /// endpoint used for each call.
    struct Canned {
        responses: Mutex<VecDeque<Result<ActionOutcome, CallFailure>>>,
        endpoints_seen: Mutex<Vec<String>>,
    }

    impl Canned {
        fn new(responses: Vec<Result<ActionOutcome, CallFailure>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                endpoints_seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.endpoints_seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl RemoteAction for Canned {
        async fn call(&self, endpoint: &str) -> Result<ActionOutcome, CallFailure> {
            self.endpoints_seen.lock().unwrap().push(endpoint.into());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(CallFailure::Transport("no canned response".into())))
        }
    }

    fn variants() -> Vec<String> {
        vec!["/vapi".into(), "/vapi/".into(), "vapi".into()]
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_sequence_succeeds_with_penalty_delays() {
        let action = Canned::new(vec![
            Err(CallFailure::Status(429)),
            Err(CallFailure::Status(429)),
            Ok(ActionOutcome::success()),
        ]);
        let retrying = RetryingAction::new(RetryPolicy::default(), variants());

        let start = Instant::now();
        let outcome = retrying.run(&action).await;

        assert!(outcome.success);
        assert_eq!(action.calls(), 3);
        // Two fixed 10 s penalties.
        assert_eq!(start.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_backoff_is_linear() {
        let action = Canned::new(vec![
            Err(CallFailure::Status(500)),
            Err(CallFailure::Status(502)),
            Ok(ActionOutcome::success()),
        ]);
        let retrying = RetryingAction::new(RetryPolicy::default(), variants());

        let start = Instant::now();
        assert!(retrying.run(&action).await.success);
        // 3 s * 1 then 3 s * 2.
        assert_eq!(start.elapsed(), Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_rotates_endpoint_variants() {
        let action = Canned::new(vec![
            Err(CallFailure::Status(404)),
            Err(CallFailure::Status(404)),
            Ok(ActionOutcome::success()),
        ]);
        let retrying = RetryingAction::new(RetryPolicy::default(), variants());

        assert!(retrying.run(&action).await.success);
        let seen = action.endpoints_seen.lock().unwrap().clone();
        assert_eq!(seen, vec!["/vapi", "/vapi/", "vapi"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_status_fails_immediately() {
        let action = Canned::new(vec![Err(CallFailure::Status(403))]);
        let retrying = RetryingAction::new(RetryPolicy::default(), variants());

        let outcome = retrying.run(&action).await;
        assert!(!outcome.success);
        assert_eq!(action.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_fail_with_last_status() {
        let action = Canned::new(vec![
            Err(CallFailure::Status(503)),
            Err(CallFailure::Status(503)),
            Err(CallFailure::Status(503)),
        ]);
        let retrying = RetryingAction::new(RetryPolicy::default(), variants());

        let outcome = retrying.run(&action).await;
        assert!(!outcome.success);
        assert_eq!(action.calls(), 3);
        assert!(outcome.error.unwrap().contains("503"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_is_terminal() {
        let action = Canned::new(vec![Err(CallFailure::Transport("connection reset".into()))]);
        let retrying = RetryingAction::new(RetryPolicy::default(), variants());

        let outcome = retrying.run(&action).await;
        assert!(!outcome.success);
        assert_eq!(action.calls(), 1);
    }
}
