//! Fanout scheduling core.
//!
//! Three components, each usable on its own:
//! - [`queue::RateLimitedQueue`]: per-owner rate limiting with a global
//!   concurrency ceiling and FIFO dispatch among eligible tasks.
//! - [`retry::RetryingAction`]: bounded retries with status-driven
//!   backoff and endpoint-variant rotation.
//! - [`planner`]: the balanced cross-assignment algorithm producing a
//!   near K-regular "who acts on whom" schedule.

pub mod planner;
pub mod queue;
pub mod retry;

// Re-export commonly used types
pub use planner::{AssignmentEdge, AssignmentPlan, DistributionReport, PlanError};
pub use queue::{QueueConfig, QueueStats, RateLimitedQueue, TaskHandle};
pub use retry::{CallFailure, RemoteAction, RetryPolicy, RetryingAction};
