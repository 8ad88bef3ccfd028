//! Core domain errors.

use thiserror::Error;

/// Core domain errors for Fanout.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Not enough owners for the requested workload.
    #[error("Need at least {needed} owners, have {have}")]
    InsufficientOwners { needed: usize, have: usize },

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
