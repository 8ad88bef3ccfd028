//! The worker pool: spawn, distribute, supervise, terminate.
//!
//! The pool owns every worker handle and the single event channel all
//! workers report on. Supervision is one select loop: worker events,
//! the stall sampler, the progress display tick, the job deadline, and
//! the external stop signal. Whatever path the job takes out of that
//! loop, it converges through the same graceful shutdown and always
//! yields a [`JobResult`].

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use fanout_core::{JobReason, JobResult, Owner, PoolPhase, ProgressReport, WorkerId, WorkerState};
use fanout_proto::{CoordinatorMessage, ProtocolError, WorkerEvent, WorkerMessage};

use crate::config::PoolConfig;
use crate::state::{PoolSnapshot, WorkerSlot};
use crate::transport::{TransportError, WorkerTransport};
use crate::workload::{self, Workload, WorkloadError};

/// Pool-level failures surfaced before supervision starts.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// `distribute` was called before `initialize`.
    #[error("pool has no workers; call initialize first")]
    NotInitialized,

    /// Shard planning failed.
    #[error(transparent)]
    Workload(#[from] WorkloadError),

    /// A shard failed validation before send.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The transport could not spawn or reach a worker.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Requests the running job to stop. Cheap to clone; safe to drop.
#[derive(Clone)]
pub struct StopHandle {
    tx: mpsc::UnboundedSender<String>,
}

impl StopHandle {
    /// Ask the pool to abort the job. No-op once the pool is gone.
    pub fn stop(&self, reason: impl Into<String>) {
        let _ = self.tx.send(reason.into());
    }
}

/// Coordinator-side worker pool.
pub struct WorkerPool {
    config: PoolConfig,
    transport: Box<dyn WorkerTransport>,
    slots: Vec<(WorkerId, WorkerSlot)>,
    events_tx: mpsc::Sender<WorkerEvent>,
    events_rx: mpsc::Receiver<WorkerEvent>,
    stop_tx: mpsc::UnboundedSender<String>,
    stop_rx: mpsc::UnboundedReceiver<String>,
    snapshot_tx: watch::Sender<PoolSnapshot>,
    phase: PoolPhase,
    total: u64,
}

impl WorkerPool {
    /// Create a pool over the given transport. No workers are spawned
    /// until [`initialize`](Self::initialize).
    pub fn new(config: PoolConfig, transport: Box<dyn WorkerTransport>) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        let (stop_tx, stop_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, _) = watch::channel(PoolSnapshot::default());
        Self {
            config,
            transport,
            slots: Vec::new(),
            events_tx,
            events_rx,
            stop_tx,
            stop_rx,
            snapshot_tx,
            phase: PoolPhase::Idle,
            total: 0,
        }
    }

    /// A handle that can abort the job from outside the supervision
    /// loop.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: self.stop_tx.clone(),
        }
    }

    /// Subscribe to point-in-time snapshots, updated as the job runs.
    pub fn subscribe(&self) -> watch::Receiver<PoolSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Spawn the configured number of workers.
    pub async fn initialize(&mut self) -> Result<(), PoolError> {
        self.set_phase(PoolPhase::Initializing);
        info!(workers = self.config.worker_count, "Spawning workers");

        for i in 0..self.config.worker_count {
            let worker_id = WorkerId::new(format!("worker-{i}"));
            let handle = self
                .transport
                .spawn(worker_id.clone(), self.events_tx.clone())
                .await?;
            self.slots.push((worker_id, WorkerSlot::new(handle)));
        }
        self.publish();
        Ok(())
    }

    /// Plan shards for `workload` over `owners` and send one to each
    /// worker. Surplus workers receive an explicitly empty shard.
    pub async fn distribute(
        &mut self,
        owners: &[Owner],
        workload: &Workload,
    ) -> Result<(), PoolError> {
        if self.slots.is_empty() {
            return Err(PoolError::NotInitialized);
        }
        self.set_phase(PoolPhase::Distributing);

        let plan = workload::plan_shards(
            owners,
            workload,
            self.slots.len(),
            self.config.min_owners_per_worker,
        )?;

        if let Some(report) = &plan.distribution {
            if report.degraded {
                warn!(
                    effective_degree = report.effective_degree,
                    "Requested cross degree exceeds what the owner pool supports"
                );
            }
            info!(
                effective_degree = report.effective_degree,
                perfect = report.perfect,
                iterations = report.iterations,
                "Cross distribution planned"
            );
        }

        self.total = plan.total;
        for ((worker_id, slot), shard) in self.slots.iter_mut().zip(plan.shards) {
            shard.validate()?;
            slot.assigned = shard.len() as u64;
            slot.state = if shard.is_empty() {
                WorkerState::Idle
            } else {
                WorkerState::Busy
            };
            slot.handle.send(CoordinatorMessage::Shard(shard)).await?;
            info!(worker_id = %worker_id, actions = slot.assigned, "Shard dispatched");
        }

        info!(total = self.total, "Distribution complete");
        self.publish();
        Ok(())
    }

    /// Supervise the job to a terminal state. Consumes the pool: every
    /// exit path terminates the workers before returning.
    pub async fn run(mut self) -> JobResult {
        let started_at = Utc::now();
        self.set_phase(PoolPhase::Running);

        if self.total == 0 {
            info!("No actions to distribute");
            return self
                .finish(
                    JobReason::Completed,
                    "no actions to distribute".to_string(),
                    started_at,
                )
                .await;
        }

        let mut sample = tokio::time::interval(self.config.sample_interval);
        sample.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut display = tokio::time::interval(self.config.progress_interval);
        display.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let deadline = tokio::time::sleep(self.config.job_timeout);
        tokio::pin!(deadline);

        let mut frozen_samples = 0u32;
        let mut last_completed = 0u64;

        let (reason, message) = loop {
            tokio::select! {
                Some(event) = self.events_rx.recv() => {
                    if let Err(err) = self.handle_event(event).await {
                        break (JobReason::Error, err.to_string());
                    }
                }
                _ = sample.tick() => {
                    let completed = self.aggregate().completed;
                    // A job that never made progress is left to the
                    // timeout; the stall detector only fires once work
                    // has started and then froze.
                    if completed > 0 && completed == last_completed {
                        frozen_samples += 1;
                        if frozen_samples >= self.config.stall_abort_samples {
                            break (
                                JobReason::Stalled,
                                format!(
                                    "no progress for {} samples at {}/{} actions",
                                    frozen_samples, completed, self.total
                                ),
                            );
                        }
                        if frozen_samples >= self.config.stall_warn_samples {
                            let stale_secs = self.config.sample_interval.as_secs() as i64;
                            let silent = self
                                .slots
                                .iter()
                                .filter(|(_, s)| {
                                    s.state.is_pending()
                                        && (Utc::now() - s.last_update).num_seconds() >= stale_secs
                                })
                                .count();
                            warn!(
                                frozen_samples,
                                completed,
                                total = self.total,
                                silent_workers = silent,
                                "Progress has not advanced"
                            );
                        }
                    } else {
                        frozen_samples = 0;
                        last_completed = completed;
                    }
                }
                _ = display.tick() => {
                    let progress = self.aggregate();
                    info!(
                        percent = progress.percent(),
                        success = progress.success,
                        failure = progress.failure,
                        completed = progress.completed,
                        total = progress.total,
                        "Progress"
                    );
                }
                _ = &mut deadline => {
                    break (
                        JobReason::TimedOut,
                        format!(
                            "job exceeded {}s ceiling",
                            self.config.job_timeout.as_secs()
                        ),
                    );
                }
                Some(why) = self.stop_rx.recv() => {
                    break (JobReason::Error, format!("stopped by caller: {why}"));
                }
            }

            self.publish();
            if self.is_complete() {
                break (
                    JobReason::Completed,
                    "all actions reached a terminal state".to_string(),
                );
            }
        };

        self.finish(reason, message, started_at).await
    }

    /// Current point-in-time view.
    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            phase: self.phase,
            progress: self.aggregate(),
            busy_workers: self
                .slots
                .iter()
                .filter(|(_, s)| s.state.is_pending())
                .count(),
            total_workers: self.slots.len(),
        }
    }

    fn set_phase(&mut self, phase: PoolPhase) {
        self.phase = phase;
        self.publish();
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }

    /// Merge worker progress under the job-wide total.
    fn aggregate(&self) -> ProgressReport {
        let mut merged = ProgressReport::default();
        for (_, slot) in &self.slots {
            merged.merge(&slot.progress);
        }
        merged.total = self.total;
        merged
    }

    /// Complete when every counted action is terminal, or when every
    /// worker that held work has reported its shard done.
    fn is_complete(&self) -> bool {
        let progress = self.aggregate();
        if progress.is_done() {
            return true;
        }
        self.slots
            .iter()
            .filter(|(_, s)| s.assigned > 0)
            .all(|(_, s)| s.state == WorkerState::Completed)
            && self.slots.iter().any(|(_, s)| s.assigned > 0)
    }

    async fn handle_event(&mut self, event: WorkerEvent) -> Result<(), PoolError> {
        match event {
            WorkerEvent::Message { worker_id, message } => {
                message.validate()?;
                let Some((_, slot)) = self.slots.iter_mut().find(|(id, _)| *id == worker_id)
                else {
                    warn!(worker_id = %worker_id, "Message from unknown worker");
                    return Ok(());
                };
                slot.last_update = Utc::now();

                match message {
                    WorkerMessage::Progress(delta) => {
                        slot.progress.merge(&delta);
                    }
                    WorkerMessage::Complete(notice) => {
                        slot.state = WorkerState::Completed;
                        info!(
                            worker_id = %worker_id,
                            processed = notice.processed,
                            "Worker completed its shard"
                        );
                    }
                    WorkerMessage::Error(fault) => {
                        warn!(worker_id = %worker_id, error = %fault.error, "Worker fault");
                    }
                }
            }
            WorkerEvent::Exited { worker_id, clean } => {
                self.handle_exit(worker_id, clean).await?;
            }
        }
        Ok(())
    }

    /// A clean exit ends the worker's participation; a crash gets the
    /// slot respawned. The shard is not resent: lost work surfaces
    /// through the stall detector or the deadline, never as silent
    /// double execution.
    async fn handle_exit(&mut self, worker_id: WorkerId, clean: bool) -> Result<(), PoolError> {
        let Some((_, slot)) = self.slots.iter_mut().find(|(id, _)| *id == worker_id) else {
            return Ok(());
        };

        if clean || self.phase.is_finished() {
            slot.state = WorkerState::Exited;
            return Ok(());
        }

        warn!(
            worker_id = %worker_id,
            spawn_count = slot.spawn_count,
            "Worker crashed; respawning"
        );
        let handle = self
            .transport
            .spawn(worker_id.clone(), self.events_tx.clone())
            .await?;
        slot.respawned(handle);
        Ok(())
    }

    /// Record the terminal reason, terminate the workers, and build the
    /// result.
    async fn finish(mut self, reason: JobReason, message: String, started_at: DateTime<Utc>) -> JobResult {
        self.set_phase(reason.phase());
        let progress = self.aggregate();

        match reason {
            JobReason::Completed => info!(
                success = progress.success,
                failure = progress.failure,
                total = progress.total,
                "Job completed"
            ),
            JobReason::Stalled | JobReason::TimedOut => warn!(
                reason = %reason,
                completed = progress.completed,
                total = progress.total,
                detail = %message,
                "Job aborted"
            ),
            JobReason::Error => error!(detail = %message, "Job failed"),
        }

        self.shutdown().await;

        JobResult {
            reason,
            progress,
            message,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Graceful terminate, then force kill whatever outlives the grace
    /// period.
    async fn shutdown(&mut self) {
        self.set_phase(PoolPhase::ShuttingDown);
        let grace_ms = self.config.shutdown_grace.as_millis() as u64;

        for (worker_id, slot) in &self.slots {
            if slot.state != WorkerState::Exited && slot.handle.is_connected() {
                if let Err(err) = slot.handle.send(CoordinatorMessage::Terminate { grace_ms }).await
                {
                    warn!(worker_id = %worker_id, error = %err, "Terminate not delivered");
                }
            }
        }

        let deadline = tokio::time::Instant::now() + self.config.shutdown_grace;
        while self
            .slots
            .iter()
            .any(|(_, s)| s.state != WorkerState::Exited && s.handle.is_connected())
        {
            match tokio::time::timeout_at(deadline, self.events_rx.recv()).await {
                Ok(Some(WorkerEvent::Exited { worker_id, .. })) => {
                    if let Some((_, slot)) =
                        self.slots.iter_mut().find(|(id, _)| *id == worker_id)
                    {
                        slot.state = WorkerState::Exited;
                    }
                }
                // Late progress during the grace window is already
                // counted or lost; either way it no longer matters.
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(_) => break,
            }
        }

        for (worker_id, slot) in &mut self.slots {
            if slot.state != WorkerState::Exited && slot.handle.is_connected() {
                warn!(worker_id = %worker_id, "Worker survived the grace period; killing");
                slot.handle.kill();
                slot.state = WorkerState::Exited;
            }
        }

        self.set_phase(PoolPhase::Terminated);
        info!("All workers terminated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::WorkerHandle;
    use async_trait::async_trait;
    use fanout_core::ActionKind;
    use fanout_proto::CompletionNotice;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn owners(n: usize) -> Vec<Owner> {
        (0..n)
            .map(|i| Owner::new(format!("acct-{i}"), format!("user_{i}")))
            .collect()
    }

    fn posts(count: u32) -> Workload {
        Workload::PerOwner {
            kind: ActionKind::Post,
            count,
            target_ref: None,
        }
    }

    fn quick_config(workers: usize) -> PoolConfig {
        PoolConfig {
            worker_count: workers,
            ..PoolConfig::default()
        }
    }

    struct ScriptedHandle {
        tx: mpsc::UnboundedSender<CoordinatorMessage>,
        connected: Arc<AtomicBool>,
    }

    #[async_trait]
    impl WorkerHandle for ScriptedHandle {
        async fn send(&self, msg: CoordinatorMessage) -> Result<(), TransportError> {
            self.tx
                .send(msg)
                .map_err(|_| TransportError::Disconnected("script ended".into()))
        }

        fn kill(&self) {
            self.connected.store(false, Ordering::SeqCst);
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }
    }

    /// A transport whose workers run a scripted async body. The script
    /// receives the spawn ordinal (respawns increment it), the inbound
    /// message channel, and the event channel back to the pool.
    struct ScriptedTransport<F> {
        script: F,
        spawns: Arc<AtomicUsize>,
    }

    impl<F> ScriptedTransport<F> {
        fn new(script: F) -> Self {
            Self {
                script,
                spawns: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl<F, Fut> WorkerTransport for ScriptedTransport<F>
    where
        F: Fn(
                usize,
                WorkerId,
                mpsc::UnboundedReceiver<CoordinatorMessage>,
                mpsc::Sender<WorkerEvent>,
                Arc<AtomicBool>,
            ) -> Fut
            + Send
            + Sync,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        async fn spawn(
            &self,
            worker_id: WorkerId,
            events: mpsc::Sender<WorkerEvent>,
        ) -> Result<Box<dyn WorkerHandle>, TransportError> {
            let ordinal = self.spawns.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = mpsc::unbounded_channel();
            let connected = Arc::new(AtomicBool::new(true));
            tokio::spawn((self.script)(
                ordinal,
                worker_id,
                rx,
                events,
                Arc::clone(&connected),
            ));
            Ok(Box::new(ScriptedHandle { tx, connected }))
        }
    }

    async fn report(
        events: &mpsc::Sender<WorkerEvent>,
        worker_id: &WorkerId,
        message: WorkerMessage,
    ) {
        let _ = events
            .send(WorkerEvent::Message {
                worker_id: worker_id.clone(),
                message,
            })
            .await;
    }

    async fn exit(events: &mpsc::Sender<WorkerEvent>, worker_id: &WorkerId, clean: bool) {
        let _ = events
            .send(WorkerEvent::Exited {
                worker_id: worker_id.clone(),
                clean,
            })
            .await;
    }

    fn delta(success: u64, failure: u64) -> ProgressReport {
        ProgressReport {
            success,
            failure,
            completed: success + failure,
            total: 0,
            artifacts: vec![],
        }
    }

    /// Script: run the shard to completion, one failure per shard, then
    /// exit cleanly.
    async fn dutiful_worker(
        _ordinal: usize,
        worker_id: WorkerId,
        mut rx: mpsc::UnboundedReceiver<CoordinatorMessage>,
        events: mpsc::Sender<WorkerEvent>,
        connected: Arc<AtomicBool>,
    ) {
        while let Some(msg) = rx.recv().await {
            match msg {
                CoordinatorMessage::Shard(shard) if !shard.is_empty() => {
                    let n = shard.len() as u64;
                    report(&events, &worker_id, WorkerMessage::Progress(delta(n - 1, 1))).await;
                    report(
                        &events,
                        &worker_id,
                        WorkerMessage::Complete(CompletionNotice { processed: n }),
                    )
                    .await;
                    connected.store(false, Ordering::SeqCst);
                    exit(&events, &worker_id, true).await;
                    return;
                }
                CoordinatorMessage::Shard(_) => {}
                CoordinatorMessage::Terminate { .. } => {
                    connected.store(false, Ordering::SeqCst);
                    exit(&events, &worker_id, true).await;
                    return;
                }
            }
        }
    }

    /// Script: sit idle, exit only when told to.
    async fn obedient_idler(
        _ordinal: usize,
        worker_id: WorkerId,
        mut rx: mpsc::UnboundedReceiver<CoordinatorMessage>,
        events: mpsc::Sender<WorkerEvent>,
        connected: Arc<AtomicBool>,
    ) {
        while let Some(msg) = rx.recv().await {
            if let CoordinatorMessage::Terminate { .. } = msg {
                connected.store(false, Ordering::SeqCst);
                exit(&events, &worker_id, true).await;
                return;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_aggregates_progress_and_completes() {
        let mut pool = WorkerPool::new(
            quick_config(2),
            Box::new(ScriptedTransport::new(dutiful_worker)),
        );
        pool.initialize().await.unwrap();
        pool.distribute(&owners(4), &posts(2)).await.unwrap();

        let result = pool.run().await;

        assert_eq!(result.reason, JobReason::Completed);
        assert_eq!(result.progress.total, 8);
        assert_eq!(result.progress.completed, 8);
        assert_eq!(result.progress.success, 6);
        assert_eq!(result.progress.failure, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stall_aborts_after_frozen_samples() {
        // One delta, then silence: progress started and froze.
        async fn stalling_worker(
            _ordinal: usize,
            worker_id: WorkerId,
            mut rx: mpsc::UnboundedReceiver<CoordinatorMessage>,
            events: mpsc::Sender<WorkerEvent>,
            connected: Arc<AtomicBool>,
        ) {
            while let Some(msg) = rx.recv().await {
                match msg {
                    CoordinatorMessage::Shard(shard) if !shard.is_empty() => {
                        report(&events, &worker_id, WorkerMessage::Progress(delta(1, 0))).await;
                    }
                    CoordinatorMessage::Shard(_) => {}
                    CoordinatorMessage::Terminate { .. } => {
                        connected.store(false, Ordering::SeqCst);
                        exit(&events, &worker_id, true).await;
                        return;
                    }
                }
            }
        }

        let mut pool = WorkerPool::new(
            quick_config(1),
            Box::new(ScriptedTransport::new(stalling_worker)),
        );
        pool.initialize().await.unwrap();
        pool.distribute(&owners(2), &posts(2)).await.unwrap();

        let result = pool.run().await;

        assert_eq!(result.reason, JobReason::Stalled);
        assert_eq!(result.progress.completed, 1);
        assert_eq!(result.progress.total, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_progress_job_hits_timeout() {
        // Never reports anything: the stall detector stays quiet and
        // the deadline fires instead.
        let mut pool = WorkerPool::new(
            quick_config(1),
            Box::new(ScriptedTransport::new(obedient_idler)),
        );
        pool.initialize().await.unwrap();
        pool.distribute(&owners(2), &posts(1)).await.unwrap();

        let result = pool.run().await;

        assert_eq!(result.reason, JobReason::TimedOut);
        assert_eq!(result.progress.completed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_crashed_worker_is_respawned() {
        // First spawn crashes after a partial delta; the respawn
        // finishes the remaining work without a shard of its own.
        async fn crash_then_recover(
            ordinal: usize,
            worker_id: WorkerId,
            mut rx: mpsc::UnboundedReceiver<CoordinatorMessage>,
            events: mpsc::Sender<WorkerEvent>,
            connected: Arc<AtomicBool>,
        ) {
            if ordinal == 0 {
                if let Some(CoordinatorMessage::Shard(_)) = rx.recv().await {
                    report(&events, &worker_id, WorkerMessage::Progress(delta(1, 0))).await;
                }
                connected.store(false, Ordering::SeqCst);
                exit(&events, &worker_id, false).await;
                return;
            }
            report(&events, &worker_id, WorkerMessage::Progress(delta(1, 0))).await;
            report(
                &events,
                &worker_id,
                WorkerMessage::Complete(CompletionNotice { processed: 1 }),
            )
            .await;
            connected.store(false, Ordering::SeqCst);
            exit(&events, &worker_id, true).await;
        }

        let transport = ScriptedTransport::new(crash_then_recover);
        let spawns = Arc::clone(&transport.spawns);

        let mut pool = WorkerPool::new(quick_config(1), Box::new(transport));
        pool.initialize().await.unwrap();
        pool.distribute(&owners(2), &posts(1)).await.unwrap();

        let result = pool.run().await;

        assert_eq!(result.reason, JobReason::Completed);
        assert_eq!(result.progress.completed, 2);
        assert_eq!(spawns.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_workload_completes_immediately() {
        let mut pool = WorkerPool::new(
            quick_config(2),
            Box::new(ScriptedTransport::new(obedient_idler)),
        );
        pool.initialize().await.unwrap();
        // Degree zero plans no edges at all.
        pool.distribute(
            &owners(3),
            &Workload::CrossLike {
                degree: 0,
                target_refs: Default::default(),
            },
        )
        .await
        .unwrap();

        let result = pool.run().await;

        assert_eq!(result.reason, JobReason::Completed);
        assert_eq!(result.progress.total, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_handle_aborts_the_job() {
        let mut pool = WorkerPool::new(
            quick_config(1),
            Box::new(ScriptedTransport::new(obedient_idler)),
        );
        pool.initialize().await.unwrap();
        pool.distribute(&owners(2), &posts(1)).await.unwrap();

        let stop = pool.stop_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            stop.stop("operator request");
        });

        let result = pool.run().await;

        assert_eq!(result.reason, JobReason::Error);
        assert!(result.message.contains("operator request"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_distribute_before_initialize_fails() {
        let mut pool = WorkerPool::new(
            quick_config(1),
            Box::new(ScriptedTransport::new(obedient_idler)),
        );
        let err = pool.distribute(&owners(2), &posts(1)).await.unwrap_err();
        assert!(matches!(err, PoolError::NotInitialized));
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_reflects_distribution() {
        let mut pool = WorkerPool::new(
            quick_config(2),
            Box::new(ScriptedTransport::new(obedient_idler)),
        );
        pool.initialize().await.unwrap();
        let mut watcher = pool.subscribe();
        pool.distribute(&owners(4), &posts(1)).await.unwrap();

        let snapshot = watcher.borrow_and_update().clone();
        assert_eq!(snapshot.phase, PoolPhase::Distributing);
        assert_eq!(snapshot.progress.total, 4);
        assert_eq!(snapshot.busy_workers, 2);
        assert_eq!(snapshot.total_workers, 2);
    }
}
