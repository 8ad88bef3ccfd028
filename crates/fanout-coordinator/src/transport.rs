//! The process transport seam.
//!
//! The coordinator never forks processes itself; it asks a
//! [`WorkerTransport`] for a handle it can send messages to and kill.
//! The bundled implementation (in `fanout-worker`) runs workers as
//! in-process tasks; a real multi-process deployment supplies a
//! fork/spawn transport behind the same trait.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use fanout_core::WorkerId;
use fanout_proto::{CoordinatorMessage, WorkerEvent};

/// Transport-level failures.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The worker could not be spawned.
    #[error("failed to spawn worker: {0}")]
    Spawn(String),

    /// The worker is no longer reachable.
    #[error("worker disconnected: {0}")]
    Disconnected(String),
}

/// A live worker as seen by the coordinator.
#[async_trait]
pub trait WorkerHandle: Send + Sync {
    /// Send a message to the worker.
    async fn send(&self, msg: CoordinatorMessage) -> Result<(), TransportError>;

    /// Force-terminate the worker. Idempotent.
    fn kill(&self);

    /// Whether the worker can still receive messages.
    fn is_connected(&self) -> bool;
}

/// Spawns workers and wires their upward events onto the coordinator's
/// aggregation channel.
#[async_trait]
pub trait WorkerTransport: Send + Sync {
    /// Spawn a worker. Messages and the eventual exit notice arrive on
    /// `events`.
    async fn spawn(
        &self,
        worker_id: WorkerId,
        events: mpsc::Sender<WorkerEvent>,
    ) -> Result<Box<dyn WorkerHandle>, TransportError>;
}
