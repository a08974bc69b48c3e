//! Job Queue
//!
//! # Algorithm
//!
//! 1. `queue_job` appends to the pending list. The first job of a tick marks
//!    a flush as pending and, in [`FlushMode::Auto`], spawns the flush on the
//!    current-thread tokio runtime it was queued from. With no such runtime
//!    the tick stays pending for the host's `flush_jobs` or `next_tick`.
//!
//! 2. `flush_jobs` clears the pending flag, takes the list, removes
//!    duplicates (first occurrence wins) and runs the snapshot in order.
//!
//! 3. Jobs queued while a flush runs are not part of its snapshot. They
//!    start a new tick and run in a later flush.

use std::cell::RefCell;
use std::collections::HashSet;

use tokio::runtime::{Handle, RuntimeFlavor};

use super::job::Job;
use crate::config::{FlushMode, SchedulerConfig};
use crate::error::{ReactivityError, Result};

#[derive(Default)]
struct JobQueue {
    jobs: Vec<Job>,
    flush_pending: bool,
    config: SchedulerConfig,
}

thread_local! {
    static QUEUE: RefCell<JobQueue> = RefCell::new(JobQueue::default());
}

/// Install the scheduler configuration for the current thread.
pub fn configure(config: SchedulerConfig) {
    tracing::debug!(?config, "scheduler configured");
    QUEUE.with(|queue| queue.borrow_mut().config = config);
}

/// The scheduler configuration of the current thread.
pub fn config() -> SchedulerConfig {
    QUEUE.with(|queue| queue.borrow().config.clone())
}

/// Queue a job for the next tick.
pub fn queue_job(job: Job) {
    let start_tick = QUEUE.with(|queue| {
        let mut queue = queue.borrow_mut();
        queue.jobs.push(job);
        if queue.flush_pending {
            None
        } else {
            queue.flush_pending = true;
            Some(queue.config.flush_mode)
        }
    });

    if let Some(mode) = start_tick {
        tracing::trace!(?mode, "flush scheduled");
        if mode == FlushMode::Auto {
            spawn_flush();
        }
    }
}

/// Spawn the flush for a new tick, if this thread drives a runtime.
///
/// The queue is thread-local, so the flush must run on this thread: only a
/// current-thread runtime guarantees that.
fn spawn_flush() {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::CurrentThread => {
            let _flush = handle.spawn(async {
                flush_jobs();
            });
        }
        Ok(_) => tracing::debug!("multi-thread runtime, tick left to the host"),
        Err(_) => tracing::trace!("no runtime, tick left to the host"),
    }
}

/// Run one tick: every job queued so far, each distinct job once.
///
/// Returns the number of jobs run.
pub fn flush_jobs() -> usize {
    let jobs = QUEUE.with(|queue| {
        let mut queue = queue.borrow_mut();
        queue.flush_pending = false;
        std::mem::take(&mut queue.jobs)
    });
    if jobs.is_empty() {
        return 0;
    }

    let mut seen = HashSet::new();
    let snapshot: Vec<Job> = jobs.into_iter().filter(|job| seen.insert(job.id())).collect();

    tracing::debug!(jobs = snapshot.len(), "flushing job queue");
    for job in &snapshot {
        job.run();
    }
    snapshot.len()
}

/// Number of queued job entries, duplicates included.
pub fn pending_job_count() -> usize {
    QUEUE.with(|queue| queue.borrow().jobs.len())
}

/// Whether a tick has been started and not yet flushed.
pub fn is_flush_pending() -> bool {
    QUEUE.with(|queue| queue.borrow().flush_pending)
}

/// Yield to the async runtime once, then flush whatever is queued.
pub async fn next_tick() {
    tokio::task::yield_now().await;
    flush_jobs();
}

/// Flush until no jobs are left.
///
/// Jobs that keep queueing jobs would never settle; after the configured
/// `flush_limit` rounds this gives up with [`ReactivityError::FlushLimitExceeded`].
pub fn run_until_idle() -> Result<usize> {
    let limit = config().flush_limit;
    let mut total = 0;

    for _ in 0..limit {
        if pending_job_count() == 0 {
            return Ok(total);
        }
        total += flush_jobs();
    }

    if pending_job_count() == 0 {
        Ok(total)
    } else {
        tracing::warn!(limit, pending = pending_job_count(), "job queue did not settle");
        Err(ReactivityError::FlushLimitExceeded { limit })
    }
}
