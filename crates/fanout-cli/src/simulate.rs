//! Simulated action executor.
//!
//! Stands in for a real remote client: random latency, a configurable
//! share of throttled calls (which exercise the retry layer), and a
//! configurable share of terminal rejections.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use fanout_core::{ActionKind, ActionOutcome, ActionSpec, Owner};
use fanout_engine::retry::{CallFailure, STATUS_RATE_LIMITED};
use fanout_worker::ActionExecutor;

pub struct SimulatedExecutor {
    /// Probability of a terminal rejection per call.
    pub fail_rate: f64,

    /// Probability of a 429 per call.
    pub throttle_rate: f64,
}

#[async_trait]
impl ActionExecutor for SimulatedExecutor {
    async fn execute(
        &self,
        owner: &Owner,
        action: &ActionSpec,
        _endpoint: &str,
    ) -> Result<ActionOutcome, CallFailure> {
        let (latency_ms, fail_roll, throttle_roll) = {
            let mut rng = rand::thread_rng();
            (
                rng.gen_range(20..200u64),
                rng.gen::<f64>(),
                rng.gen::<f64>(),
            )
        };
        tokio::time::sleep(Duration::from_millis(latency_ms)).await;

        if throttle_roll < self.throttle_rate {
            return Err(CallFailure::Status(STATUS_RATE_LIMITED));
        }
        if fail_roll < self.fail_rate {
            return Ok(ActionOutcome::failure("simulated remote rejection"));
        }

        let outcome = match action.kind() {
            ActionKind::Post => {
                ActionOutcome::success_with_artifact(format!("sim-post-{}", owner.id))
            }
            ActionKind::Like | ActionKind::CrossLike | ActionKind::Delete => {
                match action.target_ref() {
                    Some(target_ref) => ActionOutcome::success_with_artifact(target_ref),
                    None => ActionOutcome::success(),
                }
            }
            ActionKind::Comment | ActionKind::Know => ActionOutcome::success(),
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_zero_rates_always_succeed() {
        let executor = SimulatedExecutor {
            fail_rate: 0.0,
            throttle_rate: 0.0,
        };
        let owner = Owner::new("acct-1", "user_1");
        let outcome = executor
            .execute(&owner, &ActionSpec::Post { index: 0 }, "/vapi")
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.artifact.as_deref(), Some("sim-post-acct-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_fail_rate_always_fails() {
        let executor = SimulatedExecutor {
            fail_rate: 1.0,
            throttle_rate: 0.0,
        };
        let owner = Owner::new("acct-1", "user_1");
        let outcome = executor
            .execute(
                &owner,
                &ActionSpec::Like {
                    target_ref: "post-9".into(),
                },
                "/vapi",
            )
            .await
            .unwrap();
        assert!(!outcome.success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_throttle_rate_reports_status() {
        let executor = SimulatedExecutor {
            fail_rate: 0.0,
            throttle_rate: 1.0,
        };
        let owner = Owner::new("acct-1", "user_1");
        let err = executor
            .execute(&owner, &ActionSpec::Post { index: 0 }, "/vapi")
            .await
            .unwrap_err();
        assert_eq!(err, CallFailure::Status(STATUS_RATE_LIMITED));
    }
}
