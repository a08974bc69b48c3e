//! Reactive Primitives
//!
//! This module implements the dependency-tracking engine: tracked views,
//! ref cells, computed values and effects.
//!
//! # Concepts
//!
//! ## Tracked Views
//!
//! [`reactive`] wraps a raw [`crate::Object`] in a [`Reactive`] view. Reading
//! a property through the view records the running subscriber against
//! `(object, key)`; writing through it re-runs every recorded subscriber.
//!
//! ## Refs
//!
//! A [`Ref`] is a single reactive slot with its own subscriber set. Writes
//! that do not change the value are ignored.
//!
//! ## Computed Values
//!
//! A [`Computed`] caches a derived value and recomputes lazily, at most once
//! per invalidation.
//!
//! ## Effects
//!
//! A [`ReactiveEffect`] is the subscriber itself: a re-runnable body,
//! optionally paired with a scheduler callback that is called instead of
//! re-running.
//!
//! # Implementation Notes
//!
//! The running subscriber is kept on a thread-local stack (see
//! [`ReactiveContext`]). All state is per thread; handles are `!Send`.

mod computed;
mod context;
mod dep;
mod effect;
mod proxy;
mod ref_cell;
mod runtime;
mod subscriber;

pub use computed::{computed, computed_with, Computed, ComputedOptions};
pub use context::ReactiveContext;
pub use dep::Dep;
pub use effect::{effect, EffectOptions, ReactiveEffect, Scheduler};
pub use proxy::{is_reactive, reactive, to_reactive, Reactive};
pub use ref_cell::{create_ref, is_ref, Ref};
pub use runtime::{track, trigger, Runtime, TrackKey};
pub use subscriber::{Subscriber, SubscriberId};
