//! Batching Scheduler
//!
//! Watch callbacks are not delivered from inside the write that caused
//! them. Their effects queue a [`Job`] instead, and the queue is flushed
//! once per scheduling tick, after the current synchronous work is done.
//!
//! # Overview
//!
//! - Several writes in one synchronous burst queue the same job several
//!   times; the flush runs it once.
//! - A flush drains a snapshot. Jobs queued by running jobs belong to the
//!   next tick, never to the current one.
//! - By default the first job of a tick spawns a flush task on the
//!   current-thread tokio runtime. Off such a runtime, or in
//!   [`crate::config::FlushMode::Manual`], the host starts ticks by calling
//!   [`flush_jobs`] or awaiting [`next_tick`].
//!
//! There is no way to cancel a queued job; a job that should not run must
//! not be queued.

mod job;
mod queue;

pub use job::{Job, JobId};
pub use queue::{
    config, configure, flush_jobs, is_flush_pending, next_tick, pending_job_count, queue_job,
    run_until_idle,
};
