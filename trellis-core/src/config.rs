//! Scheduler Configuration
//!
//! Controls how the batching scheduler is driven. The configuration is
//! installed per thread with [`crate::scheduler::configure`], since every
//! reactive graph lives on exactly one thread.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Number of consecutive flushes `run_until_idle` performs before giving up.
pub const DEFAULT_FLUSH_LIMIT: usize = 100;

/// How a scheduling tick is started once a job has been queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushMode {
    /// The first job of a tick spawns a flush task on the current-thread
    /// tokio runtime the job was queued from. Without such a runtime the
    /// tick stays pending until the host calls `flush_jobs` or awaits
    /// `next_tick`.
    #[default]
    Auto,

    /// The host always drives ticks by calling `flush_jobs` or awaiting
    /// `next_tick`.
    Manual,
}

/// Batching scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// How flushes are started.
    pub flush_mode: FlushMode,

    /// Upper bound on flush rounds performed by `run_until_idle`.
    pub flush_limit: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            flush_mode: FlushMode::Auto,
            flush_limit: DEFAULT_FLUSH_LIMIT,
        }
    }
}

impl SchedulerConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }
}
