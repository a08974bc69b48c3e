//! Subscriber types for the reactive system.
//!
//! A Subscriber is any re-runnable computation that can join dependency
//! sets: plain effects, the effect behind a computed value, and the effect
//! behind a watcher.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::dep::Dep;

/// Unique identifier for a subscriber.
///
/// Dependency sets are keyed by this ID, which is what makes re-adding the
/// same subscriber a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A computation that reacts to changes in the dependency sets it joined.
pub trait Subscriber {
    fn subscriber_id(&self) -> SubscriberId;

    /// Whether this subscriber backs a computed value.
    ///
    /// Computed-backed subscribers are notified before plain ones.
    fn is_computed(&self) -> bool;

    /// React to a change: hand off to the scheduler callback if there is
    /// one, otherwise re-run the body.
    fn trigger(self: Rc<Self>);

    /// Record that this subscriber was added to `dep`.
    fn joined(&self, dep: &Dep);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_ids_are_unique() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let id3 = SubscriberId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }
}
