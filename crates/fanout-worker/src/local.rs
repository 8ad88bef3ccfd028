//! In-process worker transport.
//!
//! Runs each worker as a tokio task behind the coordinator's transport
//! seam. This is the bundled deployment mode; a multi-process setup
//! replaces it with a fork/spawn transport without touching the pool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use fanout_core::WorkerId;
use fanout_coordinator::{TransportError, WorkerHandle, WorkerTransport};
use fanout_proto::{CoordinatorMessage, WorkerEvent};

use crate::config::WorkerConfig;
use crate::executor::ActionExecutor;
use crate::runtime::WorkerRuntime;

/// Spawns [`WorkerRuntime`] tasks in the coordinator's own process.
pub struct LocalTransport {
    config: WorkerConfig,
    executor: Arc<dyn ActionExecutor>,
}

impl LocalTransport {
    /// Create a transport that gives every worker the same config and
    /// executor.
    pub fn new(config: WorkerConfig, executor: Arc<dyn ActionExecutor>) -> Self {
        Self { config, executor }
    }
}

struct LocalHandle {
    cmd_tx: mpsc::UnboundedSender<CoordinatorMessage>,
    abort: tokio::task::AbortHandle,
    connected: Arc<AtomicBool>,
}

#[async_trait]
impl WorkerHandle for LocalHandle {
    async fn send(&self, msg: CoordinatorMessage) -> Result<(), TransportError> {
        self.cmd_tx
            .send(msg)
            .map_err(|_| TransportError::Disconnected("worker task ended".into()))
    }

    fn kill(&self) {
        self.abort.abort();
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkerTransport for LocalTransport {
    async fn spawn(
        &self,
        worker_id: WorkerId,
        events: mpsc::Sender<WorkerEvent>,
    ) -> Result<Box<dyn WorkerHandle>, TransportError> {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (msg_tx, mut msg_rx) = mpsc::channel(64);
        let connected = Arc::new(AtomicBool::new(true));

        // Upward messages get stamped with the worker id.
        let forward_events = events.clone();
        let forward_id = worker_id.clone();
        tokio::spawn(async move {
            while let Some(message) = msg_rx.recv().await {
                if forward_events
                    .send(WorkerEvent::Message {
                        worker_id: forward_id.clone(),
                        message,
                    })
                    .await
                    .is_err()
                {
                    break;
                }
            }
        });

        let runtime = WorkerRuntime::new(
            worker_id.clone(),
            self.config.clone(),
            Arc::clone(&self.executor),
        );
        let task = tokio::spawn(runtime.run(cmd_rx, msg_tx));
        let abort = task.abort_handle();

        // Watch for the task ending and turn it into an exit notice.
        let exit_connected = Arc::clone(&connected);
        tokio::spawn(async move {
            let clean = matches!(task.await, Ok(Ok(())));
            exit_connected.store(false, Ordering::SeqCst);
            debug!(worker_id = %worker_id, clean, "Worker task ended");
            let _ = events
                .send(WorkerEvent::Exited { worker_id, clean })
                .await;
        });

        Ok(Box::new(LocalHandle {
            cmd_tx,
            abort,
            connected,
        }))
    }
}
