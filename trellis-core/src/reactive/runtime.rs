//! Reactive Runtime
//!
//! The runtime owns the dependency registry: a two-level map from tracked
//! object identity to property key to [`Dep`].
//!
//! # How It Works
//!
//! 1. A tracked read calls [`track`], which records the active subscriber in
//!    the dep for `(object, key)`, creating the entry on first use.
//!
//! 2. A tracked write calls [`trigger`], which notifies that dep.
//!
//! 3. The registry is keyed by [`ObjectId`] and never holds the object
//!    itself. When the last handle to a raw object drops, its entries are
//!    released. Deps hold their subscribers weakly, so nothing reachable
//!    from a subscriber's body is kept alive by the registry either.
//!
//! # Thread Model
//!
//! A reactive graph belongs to a single thread. The registry is
//! thread-local and needs no locking; correctness rests on record and
//! notify calls happening in program order.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::context::ReactiveContext;
use super::dep::Dep;
use super::subscriber::SubscriberId;
use crate::value::{Object, ObjectId, Value};

/// The key a dependency is recorded under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrackKey {
    /// A named property.
    Prop(Rc<str>),
    /// The set of keys itself, read by enumeration and changed by adding or
    /// removing properties.
    Iterate,
}

impl From<&str> for TrackKey {
    fn from(key: &str) -> Self {
        TrackKey::Prop(Rc::from(key))
    }
}

impl From<Rc<str>> for TrackKey {
    fn from(key: Rc<str>) -> Self {
        TrackKey::Prop(key)
    }
}

type KeyToDep = HashMap<TrackKey, Dep>;

thread_local! {
    static TARGET_MAP: RefCell<HashMap<ObjectId, KeyToDep>> = RefCell::new(HashMap::new());
}

/// Entry points into the per-thread dependency registry.
pub struct Runtime;

impl Runtime {
    pub(crate) fn track(target: ObjectId, key: TrackKey) {
        if !ReactiveContext::is_active() {
            return;
        }

        tracing::trace!(object = target.raw(), key = ?key, "track");
        let dep = TARGET_MAP.with(|map| {
            map.borrow_mut()
                .entry(target)
                .or_default()
                .entry(key)
                .or_default()
                .clone()
        });
        dep.track();
    }

    pub(crate) fn trigger(target: ObjectId, key: &TrackKey) {
        let dep = TARGET_MAP.with(|map| {
            map.borrow()
                .get(&target)
                .and_then(|deps| deps.get(key))
                .cloned()
        });

        if let Some(dep) = dep {
            tracing::trace!(object = target.raw(), key = ?key, "trigger");
            dep.trigger();
        }
    }

    /// Drop every dependency set recorded for `target`.
    pub(crate) fn release(target: ObjectId) {
        let released = TARGET_MAP.try_with(|map| {
            map.try_borrow_mut()
                .ok()
                .and_then(|mut map| map.remove(&target))
        });

        // Dropping the deps may drop subscribers and, through them, other
        // objects; that has to happen with the registry unborrowed.
        if let Ok(Some(deps)) = released {
            tracing::trace!(object = target.raw(), keys = deps.len(), "release tracked object");
            drop(deps);
        }
    }

    /// Whether the registry holds any entry for `target`.
    pub fn is_tracked(target: ObjectId) -> bool {
        TARGET_MAP.with(|map| map.borrow().contains_key(&target))
    }

    /// The dependency set recorded for `(target, key)`, if any.
    pub fn dep(target: ObjectId, key: &TrackKey) -> Option<Dep> {
        TARGET_MAP.with(|map| {
            map.borrow()
                .get(&target)
                .and_then(|deps| deps.get(key))
                .cloned()
        })
    }

    /// Get the current subscriber being tracked, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        ReactiveContext::current_subscriber()
    }

    /// Check if we're inside a reactive context.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_active()
    }
}

/// Record a read of `key` on `target` by the active subscriber.
///
/// A no-op when nothing is running. Lets collaborating layers join the
/// dependency graph without going through a tracked view.
pub fn track(target: &Object, key: impl Into<TrackKey>) {
    Runtime::track(target.id(), key.into());
}

/// Notify the subscribers of `key` on `target`.
///
/// A no-op when nobody has read that key. `new_value` is informational.
pub fn trigger(target: &Object, key: impl Into<TrackKey>, new_value: &Value) {
    let key = key.into();
    tracing::trace!(object = target.id().raw(), key = ?key, value = ?new_value, "write");
    Runtime::trigger(target.id(), &key);
}
