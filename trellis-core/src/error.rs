//! Error types.
//!
//! The reactive graph itself never fails: recording without an active
//! subscriber and notifying a key nobody observes are silent no-ops. Errors
//! only surface at the edges of the engine.

use thiserror::Error;

/// Errors reported by the reactive engine.
#[derive(Debug, Error)]
pub enum ReactivityError {
    /// A computed value without a setter was written to.
    #[error("write operation failed: computed value is readonly")]
    ReadonlyComputed,

    /// A computed getter read its own value before producing one.
    #[error("computed value read during its own first evaluation")]
    CyclicComputed,

    /// `run_until_idle` kept finding new jobs after the configured number of flushes.
    #[error("job queue did not settle after {limit} flushes")]
    FlushLimitExceeded { limit: usize },

    /// A value graph containing a reference cycle cannot be snapshotted.
    #[error("value graph contains a cycle through object #{object}")]
    CyclicValue { object: u64 },

    /// Scheduler configuration could not be parsed.
    #[error("invalid scheduler configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, ReactivityError>;
