//! Rate-limited task queue.
//!
//! One queue per worker runtime. The queue serializes work per owner
//! key (no two actions for the same owner closer than the minimum
//! interval) while running many owners concurrently, bounded by a
//! global concurrency ceiling.
//!
//! All queue state lives inside a single dispatch loop task; the public
//! handle talks to it over channels and reads counters from atomics, so
//! there is never more than one writer.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use fanout_core::{ActionOutcome, OwnerId};

/// Queue tuning knobs.
///
/// Defaults carry the empirically tuned production values: 2 s spacing
/// per owner, 100 ms dispatch tick, result retention of 1000, and a one
/// hour TTL on idle owner timestamps.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum actions in flight at once.
    pub concurrency_limit: usize,

    /// Minimum spacing between consecutive dispatches for one owner.
    pub min_interval: Duration,

    /// Dispatch loop tick.
    pub tick: Duration,

    /// How often to compact historical results and owner timestamps.
    pub compaction_interval: Duration,

    /// How many historical results to retain.
    pub result_retention: usize,

    /// Evict owner timestamps idle longer than this.
    pub owner_stamp_ttl: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 50,
            min_interval: Duration::from_millis(2000),
            tick: Duration::from_millis(100),
            compaction_interval: Duration::from_secs(300),
            result_retention: 1000,
            owner_stamp_ttl: Duration::from_secs(3600),
        }
    }
}

/// Counter snapshot. Safe to take while the queue is dispatching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Tasks ever enqueued.
    pub total: u64,
    /// Tasks that reached a terminal state.
    pub completed: u64,
    /// Terminal successes.
    pub success: u64,
    /// Terminal failures.
    pub failure: u64,
    /// Tasks admitted but not yet dispatched.
    pub pending: u64,
    /// Tasks currently in flight.
    pub running: u64,
}

/// Resolves to the task's outcome once it has run (or the queue shut
/// down with the task still pending).
pub struct TaskHandle {
    rx: oneshot::Receiver<ActionOutcome>,
}

impl TaskHandle {
    /// Wait for the task's terminal outcome. Never hangs past queue
    /// shutdown: a dropped queue resolves pending handles as failures.
    pub async fn wait(self) -> ActionOutcome {
        match self.rx.await {
            Ok(outcome) => outcome,
            Err(_) => ActionOutcome::failure("queue shut down before task ran"),
        }
    }
}

type TaskFuture = Pin<Box<dyn Future<Output = ActionOutcome> + Send>>;

struct PendingTask {
    owner: OwnerId,
    action: TaskFuture,
    done: oneshot::Sender<ActionOutcome>,
    seq: u64,
}

enum Command {
    Enqueue(PendingTask),
    Shutdown,
}

#[derive(Default)]
struct Counters {
    total: AtomicU64,
    completed: AtomicU64,
    success: AtomicU64,
    failure: AtomicU64,
    running: AtomicU64,
}

/// Rate-limited task queue handle.
///
/// Dropping the handle (or calling [`RateLimitedQueue::shutdown`])
/// stops the dispatch loop; in-flight actions are left to finish on
/// their own, pending tasks resolve as failures.
pub struct RateLimitedQueue {
    cmd_tx: mpsc::UnboundedSender<Command>,
    counters: Arc<Counters>,
    seq: AtomicU64,
}

impl RateLimitedQueue {
    /// Create a queue and start its dispatch loop on the current
    /// runtime.
    pub fn new(config: QueueConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());

        let loop_counters = counters.clone();
        tokio::spawn(async move {
            DispatchLoop::new(config, loop_counters, cmd_rx).run().await;
        });

        Self {
            cmd_tx,
            counters,
            seq: AtomicU64::new(0),
        }
    }

    /// Create a queue with default tuning.
    pub fn with_defaults() -> Self {
        Self::new(QueueConfig::default())
    }

    /// Admit a task. The action future is not polled until the owner is
    /// eligible and a concurrency slot frees up. Admission never fails;
    /// if the queue is already shut down the handle resolves as a
    /// failure.
    pub fn enqueue<F>(&self, owner: &OwnerId, action: F) -> TaskHandle
    where
        F: Future<Output = ActionOutcome> + Send + 'static,
    {
        let (done, rx) = oneshot::channel();
        let task = PendingTask {
            owner: owner.clone(),
            action: Box::pin(action),
            done,
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
        };

        self.counters.total.fetch_add(1, Ordering::Relaxed);
        if self.cmd_tx.send(Command::Enqueue(task)).is_err() {
            // Loop already gone; the dropped oneshot sender resolves
            // the handle as a failure.
            self.counters.completed.fetch_add(1, Ordering::Relaxed);
            self.counters.failure.fetch_add(1, Ordering::Relaxed);
        }
        TaskHandle { rx }
    }

    /// Counter snapshot.
    pub fn stats(&self) -> QueueStats {
        let total = self.counters.total.load(Ordering::Relaxed);
        let completed = self.counters.completed.load(Ordering::Relaxed);
        let running = self.counters.running.load(Ordering::Relaxed);
        QueueStats {
            total,
            completed,
            success: self.counters.success.load(Ordering::Relaxed),
            failure: self.counters.failure.load(Ordering::Relaxed),
            pending: total.saturating_sub(completed).saturating_sub(running),
            running,
        }
    }

    /// Stop the dispatch loop. Pending tasks resolve as failures;
    /// in-flight actions finish on their own.
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(Command::Shutdown);
    }
}

struct DispatchLoop {
    config: QueueConfig,
    counters: Arc<Counters>,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    done_tx: mpsc::UnboundedSender<ActionOutcome>,
    done_rx: mpsc::UnboundedReceiver<ActionOutcome>,
    pending: VecDeque<PendingTask>,
    last_dispatch: HashMap<OwnerId, Instant>,
    recent: VecDeque<ActionOutcome>,
    running: usize,
}

impl DispatchLoop {
    fn new(
        config: QueueConfig,
        counters: Arc<Counters>,
        cmd_rx: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        Self {
            config,
            counters,
            cmd_rx,
            done_tx,
            done_rx,
            pending: VecDeque::new(),
            last_dispatch: HashMap::new(),
            recent: VecDeque::new(),
            running: 0,
        }
    }

    async fn run(mut self) {
        let mut tick = tokio::time::interval(self.config.tick);
        let mut compaction = tokio::time::interval(self.config.compaction_interval);
        // The first interval tick fires immediately; skip it so the
        // compaction pass starts one full period in.
        compaction.tick().await;

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(Command::Enqueue(task)) => {
                        trace!(owner = %task.owner, seq = task.seq, "Task admitted");
                        self.pending.push_back(task);
                    }
                    Some(Command::Shutdown) | None => {
                        self.drain_pending();
                        break;
                    }
                },
                done = self.done_rx.recv() => {
                    if let Some(outcome) = done {
                        self.record_completion(outcome);
                    }
                }
                _ = tick.tick() => {
                    self.dispatch_eligible();
                }
                _ = compaction.tick() => {
                    self.compact();
                }
            }
        }

        debug!(
            completed = self.counters.completed.load(Ordering::Relaxed),
            "Dispatch loop stopped"
        );
    }

    /// Dispatch as many eligible tasks as concurrency allows. Among
    /// eligible tasks the oldest enqueue wins, so no owner starves.
    fn dispatch_eligible(&mut self) {
        loop {
            if self.running >= self.config.concurrency_limit {
                return;
            }

            let now = Instant::now();
            let next = self
                .pending
                .iter()
                .enumerate()
                .filter(|(_, task)| {
                    self.last_dispatch
                        .get(&task.owner)
                        .map_or(true, |last| {
                            now.duration_since(*last) >= self.config.min_interval
                        })
                })
                .min_by_key(|(_, task)| task.seq)
                .map(|(idx, _)| idx);

            let Some(task) = next.and_then(|idx| self.pending.remove(idx)) else {
                return;
            };

            self.last_dispatch.insert(task.owner.clone(), now);
            self.running += 1;
            self.counters.running.fetch_add(1, Ordering::Relaxed);
            trace!(owner = %task.owner, seq = task.seq, running = self.running, "Dispatching task");

            let done_tx = self.done_tx.clone();
            let done = task.done;
            let action = task.action;
            let counters = self.counters.clone();
            tokio::spawn(async move {
                // Run the action on its own task so a panic is caught
                // and surfaces as a failed outcome.
                let outcome = match tokio::spawn(action).await {
                    Ok(outcome) => outcome,
                    Err(e) => ActionOutcome::failure(format!("action panicked: {e}")),
                };
                // Terminal counters settle here, not in the dispatch
                // loop, so an action outliving queue shutdown still
                // reconciles `running` and `completed`.
                counters.running.fetch_sub(1, Ordering::Relaxed);
                counters.completed.fetch_add(1, Ordering::Relaxed);
                if outcome.success {
                    counters.success.fetch_add(1, Ordering::Relaxed);
                } else {
                    counters.failure.fetch_add(1, Ordering::Relaxed);
                }
                let _ = done_tx.send(outcome.clone());
                let _ = done.send(outcome);
            });
        }
    }

    fn record_completion(&mut self, outcome: ActionOutcome) {
        self.running -= 1;
        self.recent.push_back(outcome);
    }

    /// Bounded retention of results and owner timestamps. A resource
    /// bound, not a correctness requirement.
    fn compact(&mut self) {
        while self.recent.len() > self.config.result_retention {
            self.recent.pop_front();
        }

        let now = Instant::now();
        let ttl = self.config.owner_stamp_ttl;
        let before = self.last_dispatch.len();
        self.last_dispatch
            .retain(|_, last| now.duration_since(*last) <= ttl);
        let evicted = before - self.last_dispatch.len();
        if evicted > 0 {
            debug!(evicted, "Evicted idle owner timestamps");
        }
    }

    fn drain_pending(&mut self) {
        if !self.pending.is_empty() {
            warn!(
                dropped = self.pending.len(),
                "Queue shutting down with pending tasks"
            );
        }
        for task in self.pending.drain(..) {
            self.counters.completed.fetch_add(1, Ordering::Relaxed);
            self.counters.failure.fetch_add(1, Ordering::Relaxed);
            let _ = task
                .done
                .send(ActionOutcome::failure("queue shut down before task ran"));
        }
        self.last_dispatch.clear();
    }
}
