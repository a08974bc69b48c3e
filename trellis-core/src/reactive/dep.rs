//! Dependency Sets
//!
//! A [`Dep`] is the set of subscribers interested in one thing: one property
//! of a tracked object, one ref cell, or one computed value.
//!
//! # Two-Phase Trigger
//!
//! Notifying a dep runs subscribers backed by computed values first and
//! plain subscribers second. A computed value only flips its dirty flag when
//! notified, so by the time a plain effect runs and reads it, the computed
//! value is already known to be stale and recomputes on that read instead
//! of handing out its old cache.
//!
//! # Ownership
//!
//! A dep only holds its subscribers weakly. Subscribers are owned by their
//! handles (effects, computed values, watchers), so the registry never keeps
//! a subscriber, or anything its body captures, alive. Entries of dropped
//! subscribers are pruned on the next trigger.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::context::ReactiveContext;
use super::subscriber::{Subscriber, SubscriberId};

#[derive(Default)]
struct DepInner {
    subscribers: RefCell<IndexMap<SubscriberId, Weak<dyn Subscriber>>>,
}

/// A set of subscribers, shared by handle.
#[derive(Clone, Default)]
pub struct Dep(Rc<DepInner>);

/// Non-owning handle to a [`Dep`], held by the subscribers that joined it.
#[derive(Clone)]
pub(crate) struct WeakDep(Weak<DepInner>);

impl WeakDep {
    pub(crate) fn upgrade(&self) -> Option<Dep> {
        self.0.upgrade().map(Dep)
    }
}

impl Dep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the active subscriber, if there is one.
    ///
    /// Returns `true` if the subscriber was not a member yet.
    pub fn track(&self) -> bool {
        let Some(active) = ReactiveContext::current() else {
            return false;
        };

        let id = active.subscriber_id();
        let added = {
            let mut subscribers = self.0.subscribers.borrow_mut();
            if subscribers.contains_key(&id) {
                false
            } else {
                subscribers.insert(id, Rc::downgrade(&active));
                true
            }
        };

        if added {
            active.joined(self);
        }
        added
    }

    /// Notify every subscriber, computed-backed ones first.
    ///
    /// The subscriber that is currently running is skipped, so an effect
    /// that writes to something it reads does not re-enter itself.
    pub fn trigger(&self) {
        let subscribers: Vec<Rc<dyn Subscriber>> = {
            let mut entries = self.0.subscribers.borrow_mut();
            entries.retain(|_, subscriber| subscriber.strong_count() > 0);
            entries.values().filter_map(Weak::upgrade).collect()
        };
        if subscribers.is_empty() {
            return;
        }

        let running = ReactiveContext::current_subscriber();
        tracing::trace!(subscribers = subscribers.len(), "notify dependency set");

        let (computed, plain): (Vec<_>, Vec<_>) =
            subscribers.into_iter().partition(|s| s.is_computed());

        for subscriber in computed.into_iter().chain(plain) {
            if Some(subscriber.subscriber_id()) == running {
                continue;
            }
            subscriber.trigger();
        }
    }

    /// Remove a subscriber from the set.
    ///
    /// Returns `false` if it was not a member, or if the set is busy.
    pub(crate) fn remove(&self, id: SubscriberId) -> bool {
        match self.0.subscribers.try_borrow_mut() {
            Ok(mut subscribers) => subscribers.shift_remove(&id).is_some(),
            Err(_) => false,
        }
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.0
            .subscribers
            .borrow()
            .get(&id)
            .is_some_and(|subscriber| subscriber.strong_count() > 0)
    }

    /// Number of live subscribers.
    pub fn len(&self) -> usize {
        self.0
            .subscribers
            .borrow()
            .values()
            .filter(|subscriber| subscriber.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn downgrade(&self) -> WeakDep {
        WeakDep(Rc::downgrade(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    struct Recorder {
        id: SubscriberId,
        computed: bool,
        name: &'static str,
        log: Rc<RefCell<Vec<&'static str>>>,
        joined: Cell<usize>,
    }

    impl Subscriber for Recorder {
        fn subscriber_id(&self) -> SubscriberId {
            self.id
        }

        fn is_computed(&self) -> bool {
            self.computed
        }

        fn trigger(self: Rc<Self>) {
            self.log.borrow_mut().push(self.name);
        }

        fn joined(&self, _dep: &Dep) {
            self.joined.set(self.joined.get() + 1);
        }
    }

    fn recorder(
        name: &'static str,
        computed: bool,
        log: &Rc<RefCell<Vec<&'static str>>>,
    ) -> Rc<Recorder> {
        Rc::new(Recorder {
            id: SubscriberId::new(),
            computed,
            name,
            log: Rc::clone(log),
            joined: Cell::new(0),
        })
    }

    #[test]
    fn track_without_active_subscriber_is_noop() {
        let dep = Dep::new();
        assert!(!dep.track());
        assert!(dep.is_empty());
    }

    #[test]
    fn track_has_set_semantics() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sub = recorder("a", false, &log);
        let dep = Dep::new();

        {
            let _ctx = ReactiveContext::enter(sub.clone());
            assert!(dep.track());
            assert!(!dep.track());
        }

        assert_eq!(dep.len(), 1);
        assert_eq!(sub.joined.get(), 1);
        assert!(dep.contains(sub.id));
    }

    #[test]
    fn computed_subscribers_trigger_first() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let dep = Dep::new();

        let subs = [
            recorder("plain-1", false, &log),
            recorder("computed-1", true, &log),
            recorder("plain-2", false, &log),
            recorder("computed-2", true, &log),
        ];
        for sub in &subs {
            let _ctx = ReactiveContext::enter(sub.clone());
            dep.track();
        }

        dep.trigger();
        assert_eq!(
            *log.borrow(),
            vec!["computed-1", "computed-2", "plain-1", "plain-2"]
        );
    }

    #[test]
    fn running_subscriber_is_not_retriggered() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let me = recorder("me", false, &log);
        let other = recorder("other", false, &log);
        let dep = Dep::new();

        {
            let _ctx = ReactiveContext::enter(other.clone());
            dep.track();
        }

        let _ctx = ReactiveContext::enter(me);
        dep.track();
        dep.trigger();

        assert_eq!(*log.borrow(), vec!["other"]);
    }

    #[test]
    fn remove_unsubscribes() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sub = recorder("a", false, &log);
        let dep = Dep::new();
        {
            let _ctx = ReactiveContext::enter(sub.clone());
            dep.track();
        }

        assert!(dep.remove(sub.id));
        assert!(!dep.remove(sub.id));
        dep.trigger();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn dropped_subscribers_are_not_kept_alive() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let kept = recorder("kept", false, &log);
        let dropped = recorder("dropped", false, &log);
        let dep = Dep::new();

        for sub in [kept.clone(), dropped.clone()] {
            let _ctx = ReactiveContext::enter(sub);
            dep.track();
        }
        assert_eq!(dep.len(), 2);

        let weak = Rc::downgrade(&dropped);
        drop(dropped);
        assert!(weak.upgrade().is_none());
        assert_eq!(dep.len(), 1);

        dep.trigger();
        assert_eq!(*log.borrow(), vec!["kept"]);
    }
}
