//! One-job façade over the pool.
//!
//! Callers that just want "run this workload over these owners" use
//! [`JobSupervisor`]: it wires initialize and distribute together,
//! runs supervision on a background task, and exposes progress, a stop
//! switch, and the final [`JobResult`].

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use fanout_core::{JobId, JobReason, JobResult, Owner};

use crate::config::PoolConfig;
use crate::metrics;
use crate::pool::{PoolError, StopHandle, WorkerPool};
use crate::state::PoolSnapshot;
use crate::transport::WorkerTransport;
use crate::workload::Workload;

/// A running job. Dropping the supervisor does not stop the job; call
/// [`stop`](Self::stop) or let it run to a terminal state.
pub struct JobSupervisor {
    job_id: JobId,
    stop: StopHandle,
    snapshots: watch::Receiver<PoolSnapshot>,
    task: JoinHandle<JobResult>,
    started_at: DateTime<Utc>,
}

impl JobSupervisor {
    /// Spawn workers, distribute the workload, and start supervision.
    pub async fn start(
        config: PoolConfig,
        transport: Box<dyn WorkerTransport>,
        owners: &[Owner],
        workload: &Workload,
    ) -> Result<Self, PoolError> {
        let job_id = JobId::generate();
        info!(job_id = %job_id, owners = owners.len(), "Starting job");

        let mut pool = WorkerPool::new(config, transport);
        pool.initialize().await?;
        pool.distribute(owners, workload).await?;

        let stop = pool.stop_handle();
        let snapshots = pool.subscribe();
        let started_at = Utc::now();
        let task = tokio::spawn(pool.run());

        Ok(Self {
            job_id,
            stop,
            snapshots,
            task,
            started_at,
        })
    }

    /// This job's id.
    pub fn id(&self) -> &JobId {
        &self.job_id
    }

    /// Latest snapshot of the running job.
    pub fn progress(&self) -> PoolSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Prometheus text for the latest snapshot.
    pub fn metrics(&self) -> String {
        metrics::collect_metrics(&self.progress())
    }

    /// Ask the job to abort. The result still arrives through
    /// [`wait`](Self::wait).
    pub fn stop(&self, reason: impl Into<String>) {
        self.stop.stop(reason);
    }

    /// A cloneable stop switch, usable after `wait` takes the
    /// supervisor.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Wait for the job's terminal result.
    pub async fn wait(self) -> JobResult {
        let progress = self.snapshots.borrow().progress.clone();
        match self.task.await {
            Ok(result) => result,
            Err(err) => JobResult {
                reason: JobReason::Error,
                progress,
                message: format!("supervision task failed: {err}"),
                started_at: self.started_at,
                finished_at: Utc::now(),
            },
        }
    }
}
