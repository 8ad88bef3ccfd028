//! Fanout coordinator.
//!
//! Master-side component: spawns and supervises workers through the
//! [`transport::WorkerTransport`] seam, shards owners and assignments
//! across them, merges progress reports, detects completion, stalls,
//! and timeouts, and always terminates a job with a [`fanout_core::JobResult`].

pub mod config;
pub mod job;
pub mod metrics;
pub mod pool;
pub mod state;
pub mod transport;
pub mod workload;

// Re-export commonly used types
pub use config::PoolConfig;
pub use job::JobSupervisor;
pub use pool::{PoolError, StopHandle, WorkerPool};
pub use state::PoolSnapshot;
pub use transport::{TransportError, WorkerHandle, WorkerTransport};
pub use workload::{Workload, WorkloadError};
