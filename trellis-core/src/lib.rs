//! Trellis Core
//!
//! A fine-grained reactive state engine. Data wrapped in a tracked view
//! records which computation reads each property, and writes re-run exactly
//! those computations.
//!
//! It implements:
//!
//! - Tracked views over dynamic objects (`reactive`)
//! - Ref cells and lazily cached computed values
//! - Effects with optional scheduler callbacks
//! - Watchers whose callbacks are batched per scheduling tick
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `value`: the dynamic data model (objects, values, JSON bridge)
//! - `reactive`: dependency tracking and the reactive primitives
//! - `scheduler`: the batching job queue
//! - `watch`: watchers built from effects and the scheduler
//! - `config` / `error`: scheduler configuration and the error type
//!
//! All state is thread-local and handles are `!Send`.
//!
//! # Example
//!
//! ```rust,ignore
//! use trellis_core::{computed, effect, reactive, EffectOptions, Object};
//!
//! // Create a tracked view
//! let state = reactive(&Object::from_entries([("count", 0)]));
//!
//! // Create a derived value
//! let doubled = {
//!     let state = state.clone();
//!     computed(move || state.get("count").as_int().unwrap_or(0) * 2)
//! };
//!
//! // Create an effect; it stays subscribed while the handle lives
//! let _log = effect(
//!     move || println!("Doubled: {}", doubled.get()),
//!     EffectOptions::default(),
//! );
//!
//! // Update the state
//! state.set("count", 5);
//! // Effect automatically runs, prints: "Doubled: 10"
//! ```

pub mod config;
pub mod error;
pub mod reactive;
pub mod scheduler;
pub mod value;
pub mod watch;

pub use config::{FlushMode, SchedulerConfig};
pub use error::{ReactivityError, Result};
pub use reactive::{
    computed, computed_with, create_ref, effect, is_reactive, is_ref, reactive, track, trigger,
    Computed, ComputedOptions, EffectOptions, Reactive, ReactiveEffect, Ref, Runtime, TrackKey,
};
pub use scheduler::{flush_jobs, next_tick, queue_job, Job};
pub use value::{Object, ObjectId, Value};
pub use watch::{watch, WatchHandle, WatchOptions, WatchSource};
