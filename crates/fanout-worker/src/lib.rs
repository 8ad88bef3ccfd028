//! Fanout worker runtime.
//!
//! Executes one shard: every assignment goes through the per-owner
//! rate-limited queue wrapped in the retry layer, progress flows back
//! to the coordinator as periodic deltas, and termination drains what
//! it can inside the grace window. Also ships [`local::LocalTransport`],
//! which runs workers as in-process tasks behind the coordinator's
//! transport seam.

pub mod config;
pub mod executor;
pub mod local;
pub mod runtime;

// Re-export commonly used types
pub use config::WorkerConfig;
pub use executor::ActionExecutor;
pub use local::LocalTransport;
pub use runtime::{WorkerError, WorkerRuntime};
