//! Error types for the grouping pipeline.
//!
//! This module defines the central [`Error`] enum, which captures every
//! failure the pipeline can surface. All failures are terminal for the run:
//! the owning step records the error and the job stops.
//!
//! ## Error Cases
//! - `InvalidConfig`: Job parameters violated a constraint.
//! - `Store`: The record store rejected or failed an operation.
//! - `WriteMismatch`: A chunk write applied fewer rows than it was given.
//! - `OutOfOrderScan`: A scan page broke the ascending-id cursor contract.
//! - `ChannelError`: Internal communication with a worker failed.
//! - `PoolShutdown`: Work was submitted after the worker pool shut down.
//! - `StepFailed`: A job step failed; wraps the step's own error.

use crate::RecordId;

/// Crate-wide result alias.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Unified error type for the grouping pipeline.
#[derive(Clone, thiserror::Error, Debug)]
pub enum Error {
    /// Job parameters failed validation.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// A record store operation failed.
    #[error("Store error during {operation}: {message}")]
    Store {
        operation: &'static str,
        message: String,
    },

    /// A batched chunk write did not apply to every row in the chunk.
    #[error("Chunk {chunk} applied {applied} of {expected} row updates")]
    WriteMismatch {
        chunk: u64,
        expected: u64,
        applied: u64,
    },

    /// A scan page returned a record at or behind the cursor.
    #[error("Scan returned record {id} out of order (cursor: {cursor:?})")]
    OutOfOrderScan {
        id: RecordId,
        cursor: Option<RecordId>,
    },

    /// Internal channel send/receive failure.
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// The worker pool is shutting down and refuses new work.
    #[error("Worker pool is shutting down")]
    PoolShutdown,

    /// A job step failed.
    #[error("Step `{step}` failed: {source}")]
    StepFailed {
        step: &'static str,
        source: Box<Error>,
    },
}

impl Error {
    /// Wraps a store-level failure with the operation that produced it.
    pub fn store(operation: &'static str, err: impl core::fmt::Display) -> Self {
        Self::Store {
            operation,
            message: err.to_string(),
        }
    }

    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::store("postgres", err)
    }
}
