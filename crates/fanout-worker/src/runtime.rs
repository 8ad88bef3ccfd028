//! The worker runtime: one shard, one local queue, periodic deltas.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use fanout_core::{ActionOutcome, Owner, OwnerId, ProgressReport, WorkerId};
use fanout_engine::queue::RateLimitedQueue;
use fanout_engine::retry::RetryingAction;
use fanout_proto::{CompletionNotice, CoordinatorMessage, ProtocolError, WorkerFault, WorkerMessage};

use crate::config::WorkerConfig;
use crate::executor::{ActionExecutor, BoundAction};

/// Worker runtime failures.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The received shard violated protocol invariants.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The coordinator side of the channel is gone.
    #[error("coordinator channel closed")]
    Disconnected,
}

/// Executes one shard and reports progress until done or terminated.
pub struct WorkerRuntime {
    worker_id: WorkerId,
    config: WorkerConfig,
    executor: Arc<dyn ActionExecutor>,
}

impl WorkerRuntime {
    /// Create a runtime around an executor.
    pub fn new(worker_id: WorkerId, config: WorkerConfig, executor: Arc<dyn ActionExecutor>) -> Self {
        Self {
            worker_id,
            config,
            executor,
        }
    }

    /// Run to completion: wait for the shard, execute it through the
    /// local queue, report deltas, send the completion notice.
    ///
    /// Workers only report deltas since the previous report; cumulative
    /// totals live coordinator-side. An empty shard means "idle this
    /// job": the runtime then waits for terminate without reporting.
    pub async fn run(
        self,
        mut inbox: mpsc::UnboundedReceiver<CoordinatorMessage>,
        outbox: mpsc::Sender<WorkerMessage>,
    ) -> Result<(), WorkerError> {
        info!(worker_id = %self.worker_id, "Worker started");

        let shard = loop {
            match inbox.recv().await {
                Some(CoordinatorMessage::Shard(shard)) => break shard,
                Some(CoordinatorMessage::Terminate { .. }) | None => {
                    return Ok(());
                }
            }
        };
        if let Err(err) = shard.validate() {
            // Tell the coordinator what went wrong before exiting; the
            // exit itself only says "not clean".
            let _ = outbox
                .send(WorkerMessage::Error(WorkerFault {
                    error: err.to_string(),
                }))
                .await;
            return Err(WorkerError::Protocol(err));
        }

        if shard.is_empty() {
            info!(worker_id = %self.worker_id, "Empty shard; idling until terminate");
            while let Some(msg) = inbox.recv().await {
                if matches!(msg, CoordinatorMessage::Terminate { .. }) {
                    break;
                }
            }
            return Ok(());
        }

        let owners: HashMap<OwnerId, Owner> = shard
            .owners
            .iter()
            .map(|o| (o.id.clone(), o.clone()))
            .collect();
        let total = shard.assignments.len() as u64;
        info!(
            worker_id = %self.worker_id,
            owners = owners.len(),
            actions = total,
            "Shard accepted"
        );

        let queue = RateLimitedQueue::new(self.config.queue.clone());
        let (done_tx, mut done_rx) = mpsc::channel::<ActionOutcome>(64);

        for assignment in shard.assignments {
            // validate() guarantees the owner exists.
            let Some(owner) = owners.get(&assignment.owner) else {
                continue;
            };
            let bound = BoundAction {
                executor: Arc::clone(&self.executor),
                owner: owner.clone(),
                action: assignment.action,
            };
            let retrier =
                RetryingAction::new(self.config.retry.clone(), self.config.endpoints.clone());
            let handle = queue.enqueue(&assignment.owner, async move {
                retrier.run(&bound).await
            });
            let done_tx = done_tx.clone();
            tokio::spawn(async move {
                let _ = done_tx.send(handle.wait().await).await;
            });
        }
        drop(done_tx);

        let mut delta = ProgressReport::default();
        let mut processed = 0u64;
        let mut report = tokio::time::interval(self.config.report_interval);
        report.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                maybe = done_rx.recv() => {
                    let Some(outcome) = maybe else { break };
                    processed += 1;
                    tally(&mut delta, &outcome);
                    if processed >= total {
                        break;
                    }
                }
                _ = report.tick() => {
                    flush(&outbox, &mut delta).await?;
                }
                maybe = inbox.recv() => {
                    match maybe {
                        Some(CoordinatorMessage::Terminate { grace_ms }) => {
                            info!(worker_id = %self.worker_id, grace_ms, "Terminate received");
                            queue.shutdown();
                            let drain = async {
                                while processed < total {
                                    match done_rx.recv().await {
                                        Some(outcome) => {
                                            processed += 1;
                                            tally(&mut delta, &outcome);
                                        }
                                        None => break,
                                    }
                                }
                            };
                            let grace = Duration::from_millis(grace_ms);
                            if tokio::time::timeout(grace, drain).await.is_err() {
                                warn!(
                                    worker_id = %self.worker_id,
                                    processed,
                                    total,
                                    "Grace period expired with work still in flight"
                                );
                            }
                            break;
                        }
                        Some(CoordinatorMessage::Shard(_)) => {
                            warn!(worker_id = %self.worker_id, "Shard received while one is running");
                        }
                        None => {
                            queue.shutdown();
                            return Err(WorkerError::Disconnected);
                        }
                    }
                }
            }
        }

        queue.shutdown();
        flush(&outbox, &mut delta).await?;
        outbox
            .send(WorkerMessage::Complete(CompletionNotice { processed }))
            .await
            .map_err(|_| WorkerError::Disconnected)?;
        info!(worker_id = %self.worker_id, processed, "Shard complete");
        Ok(())
    }
}

fn tally(delta: &mut ProgressReport, outcome: &ActionOutcome) {
    if outcome.success {
        delta.success += 1;
    } else {
        delta.failure += 1;
    }
    delta.completed += 1;
    if let Some(artifact) = &outcome.artifact {
        delta.artifacts.push(artifact.clone());
    }
}

/// Send the accumulated delta if there is anything to say, resetting
/// the local counters.
async fn flush(
    outbox: &mpsc::Sender<WorkerMessage>,
    delta: &mut ProgressReport,
) -> Result<(), WorkerError> {
    if delta.completed == 0 && delta.artifacts.is_empty() {
        return Ok(());
    }
    let report = std::mem::take(delta);
    debug!(completed = report.completed, "Reporting progress delta");
    outbox
        .send(WorkerMessage::Progress(report))
        .await
        .map_err(|_| WorkerError::Disconnected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fanout_core::ActionSpec;
    use fanout_engine::retry::CallFailure;
    use fanout_proto::{Assignment, WorkerShard};

    fn owner(id: &str) -> Owner {
        Owner::new(id, format!("user_{id}"))
    }

    struct Succeeding;

    #[async_trait]
    impl ActionExecutor for Succeeding {
        async fn execute(
            &self,
            owner: &Owner,
            action: &ActionSpec,
            _endpoint: &str,
        ) -> Result<ActionOutcome, CallFailure> {
            match action {
                ActionSpec::Post { index } => {
                    Ok(ActionOutcome::success_with_artifact(format!(
                        "{}-post-{index}",
                        owner.id
                    )))
                }
                _ => Ok(ActionOutcome::success()),
            }
        }
    }

    struct Hanging;

    #[async_trait]
    impl ActionExecutor for Hanging {
        async fn execute(
            &self,
            _owner: &Owner,
            _action: &ActionSpec,
            _endpoint: &str,
        ) -> Result<ActionOutcome, CallFailure> {
            std::future::pending().await
        }
    }

    fn post_shard() -> WorkerShard {
        WorkerShard::new(
            vec![owner("a"), owner("b")],
            vec![
                Assignment::new("a", ActionSpec::Post { index: 0 }),
                Assignment::new("a", ActionSpec::Post { index: 1 }),
                Assignment::new("b", ActionSpec::Post { index: 0 }),
                Assignment::new("b", ActionSpec::Post { index: 1 }),
            ],
        )
    }

    fn start(
        executor: Arc<dyn ActionExecutor>,
    ) -> (
        mpsc::UnboundedSender<CoordinatorMessage>,
        mpsc::Receiver<WorkerMessage>,
        tokio::task::JoinHandle<Result<(), WorkerError>>,
    ) {
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::channel(64);
        let runtime = WorkerRuntime::new(
            WorkerId::new("worker-under-test"),
            WorkerConfig::default(),
            executor,
        );
        let task = tokio::spawn(runtime.run(in_rx, out_tx));
        (in_tx, out_rx, task)
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_shard_and_deltas_sum_to_total() {
        let (in_tx, mut out_rx, task) = start(Arc::new(Succeeding));
        in_tx
            .send(CoordinatorMessage::Shard(post_shard()))
            .unwrap();

        let mut merged = ProgressReport::default();
        let mut reports = 0u32;
        let notice = loop {
            match out_rx.recv().await.unwrap() {
                WorkerMessage::Progress(delta) => {
                    merged.merge(&delta);
                    reports += 1;
                }
                WorkerMessage::Complete(notice) => break notice,
                WorkerMessage::Error(fault) => panic!("unexpected fault: {}", fault.error),
            }
        };

        // Deltas reset after every report, so merging them must land
        // exactly on the shard size with no double counting.
        assert_eq!(notice.processed, 4);
        assert_eq!(merged.completed, 4);
        assert_eq!(merged.success, 4);
        assert_eq!(merged.failure, 0);
        assert_eq!(merged.artifacts.len(), 4);
        assert!(reports >= 1);
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_shard_idles_until_terminate() {
        let (in_tx, mut out_rx, task) = start(Arc::new(Succeeding));
        in_tx
            .send(CoordinatorMessage::Shard(WorkerShard::empty()))
            .unwrap();
        in_tx
            .send(CoordinatorMessage::Terminate { grace_ms: 1000 })
            .unwrap();

        assert!(task.await.unwrap().is_ok());
        assert!(out_rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_shard_is_rejected_and_reported() {
        let (in_tx, mut out_rx, task) = start(Arc::new(Succeeding));
        let shard = WorkerShard::new(
            vec![owner("a")],
            vec![Assignment::new("ghost", ActionSpec::Post { index: 0 })],
        );
        in_tx.send(CoordinatorMessage::Shard(shard)).unwrap();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(WorkerError::Protocol(_))));

        // The coordinator hears the reason, not just the exit.
        let fault = match out_rx.recv().await.unwrap() {
            WorkerMessage::Error(fault) => fault,
            other => panic!("expected a fault, got {other:?}"),
        };
        assert!(fault.error.contains("ghost"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminate_resolves_queued_work_as_failures() {
        let (in_tx, mut out_rx, task) = start(Arc::new(Hanging));
        // Two actions for one owner: the first hangs in flight, the
        // second is still queued behind the per-owner interval.
        let shard = WorkerShard::new(
            vec![owner("a")],
            vec![
                Assignment::new("a", ActionSpec::Post { index: 0 }),
                Assignment::new("a", ActionSpec::Post { index: 1 }),
            ],
        );
        in_tx.send(CoordinatorMessage::Shard(shard)).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        in_tx
            .send(CoordinatorMessage::Terminate { grace_ms: 1000 })
            .unwrap();

        let mut merged = ProgressReport::default();
        let notice = loop {
            match out_rx.recv().await.unwrap() {
                WorkerMessage::Progress(delta) => merged.merge(&delta),
                WorkerMessage::Complete(notice) => break notice,
                WorkerMessage::Error(fault) => panic!("unexpected fault: {}", fault.error),
            }
        };

        // The queued action resolves as a failure; the in-flight one is
        // abandoned when the grace period expires.
        assert_eq!(notice.processed, 1);
        assert_eq!(merged.failure, 1);
        assert_eq!(merged.success, 0);
        assert!(task.await.unwrap().is_ok());
    }
}
