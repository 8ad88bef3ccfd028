//! Fanout Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/transport
//! - Async runtime specifics
//!
//! All types here represent the core business domain of Fanout:
//! owners (account identities), the actions performed on their behalf,
//! and the progress bookkeeping that flows from workers up to the
//! coordinator.

pub mod action;
pub mod error;
pub mod ids;
pub mod owner;
pub mod progress;
pub mod status;

// Re-export commonly used types
pub use action::{ActionKind, ActionOutcome, ActionSpec};
pub use error::CoreError;
pub use ids::{JobId, OwnerId, WorkerId};
pub use owner::{validate_owners, Capability, Owner, ProxyEndpoint};
pub use progress::{JobResult, ProgressReport};
pub use status::{JobReason, PoolPhase, WorkerState};
