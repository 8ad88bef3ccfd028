//! Message protocol between the Fanout coordinator and its workers.
//!
//! This crate contains:
//! - The tagged-union message types exchanged over the worker transport
//! - Shard/assignment payloads
//! - Validation applied at both ends of the pipe
//!
//! Messages are serde-serializable so a transport may ship them across
//! a process boundary as JSON; the bundled in-process transport passes
//! them by value.

pub mod message;
pub mod shard;

// Re-export commonly used types
pub use message::{
    CompletionNotice, CoordinatorMessage, ProtocolError, WorkerEvent, WorkerFault, WorkerMessage,
};
pub use shard::{Assignment, WorkerShard};
