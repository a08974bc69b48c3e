//! Effect Implementation
//!
//! A [`ReactiveEffect`] is a re-runnable computation. Running it makes it the
//! active subscriber, so every tracked read inside the body subscribes it.
//!
//! # How Effects Work
//!
//! 1. `run()` enters a reactive context for the effect, runs the body and
//!    returns its result. The previous subscriber becomes active again when
//!    the body returns.
//!
//! 2. When a dependency changes, the effect is triggered: if it carries a
//!    scheduler callback, only the scheduler is called; otherwise the body
//!    runs again immediately.
//!
//! 3. Every dependency set the effect joins is remembered, so `stop()` can
//!    take it out of all of them. A stopped effect still runs when asked,
//!    but untracked.
//!
//! 4. Dependency sets do not own their subscribers. An effect lives as long
//!    as one of its handles does; dropping the last handle leaves every set
//!    it joined, exactly like `stop()`.

use std::cell::{Cell, RefCell};
use std::fmt::{self, Debug};
use std::rc::Rc;

use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::dep::{Dep, WeakDep};
use super::subscriber::{Subscriber, SubscriberId};

/// Callback invoked instead of re-running an effect's body.
pub type Scheduler = Rc<dyn Fn()>;

/// Options for [`effect`].
#[derive(Clone, Default)]
pub struct EffectOptions {
    /// Do not run the effect on creation.
    pub lazy: bool,

    /// Called on trigger instead of re-running the body.
    pub scheduler: Option<Scheduler>,
}

impl EffectOptions {
    pub fn lazy() -> Self {
        Self {
            lazy: true,
            scheduler: None,
        }
    }

    pub fn with_scheduler<F>(mut self, scheduler: F) -> Self
    where
        F: Fn() + 'static,
    {
        self.scheduler = Some(Rc::new(scheduler));
        self
    }
}

struct EffectInner<T> {
    id: SubscriberId,
    body: Box<dyn Fn() -> T>,
    scheduler: Option<Scheduler>,
    computed: bool,
    active: Cell<bool>,
    deps: RefCell<SmallVec<[WeakDep; 4]>>,
    run_count: Cell<usize>,
}

impl<T: 'static> EffectInner<T> {
    fn run(self: &Rc<Self>) -> T {
        if !self.active.get() {
            return ReactiveContext::untracked(|| (self.body)());
        }

        let _ctx = ReactiveContext::enter(Rc::clone(self) as Rc<dyn Subscriber>);
        self.run_count.set(self.run_count.get() + 1);
        (self.body)()
    }
}

impl<T> Drop for EffectInner<T> {
    fn drop(&mut self) {
        for dep in self.deps.get_mut().iter().filter_map(WeakDep::upgrade) {
            dep.remove(self.id);
        }
    }
}

impl<T: 'static> Subscriber for EffectInner<T> {
    fn subscriber_id(&self) -> SubscriberId {
        self.id
    }

    fn is_computed(&self) -> bool {
        self.computed
    }

    fn trigger(self: Rc<Self>) {
        match &self.scheduler {
            Some(scheduler) => scheduler(),
            None => {
                self.run();
            }
        }
    }

    fn joined(&self, dep: &Dep) {
        self.deps.borrow_mut().push(dep.downgrade());
    }
}

/// A re-runnable computation whose tracked reads subscribe it to changes.
///
/// The effect stays subscribed while a handle to it is alive.
///
/// # Example
///
/// ```rust,ignore
/// let count = Ref::new(0);
///
/// let _log = effect(move || println!("count is {:?}", count.get()), EffectOptions::default());
///
/// count.set(5);  // Prints: "count is 5"
/// ```
#[must_use = "an effect is unsubscribed when its last handle is dropped"]
pub struct ReactiveEffect<T: 'static = ()> {
    inner: Rc<EffectInner<T>>,
}

impl<T: 'static> ReactiveEffect<T> {
    /// Create an effect. Nothing runs until [`ReactiveEffect::run`].
    pub fn new<F>(body: F, scheduler: Option<Scheduler>) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self::build(Box::new(body), scheduler, false)
    }

    /// Create the effect backing a computed value.
    pub(crate) fn new_computed(body: Box<dyn Fn() -> T>, scheduler: Scheduler) -> Self {
        Self::build(body, Some(scheduler), true)
    }

    fn build(body: Box<dyn Fn() -> T>, scheduler: Option<Scheduler>, computed: bool) -> Self {
        Self {
            inner: Rc::new(EffectInner {
                id: SubscriberId::new(),
                body,
                scheduler,
                computed,
                active: Cell::new(true),
                deps: RefCell::new(SmallVec::new()),
                run_count: Cell::new(0),
            }),
        }
    }

    /// Run the body as the active subscriber and return its result.
    pub fn run(&self) -> T {
        self.inner.run()
    }

    /// Unsubscribe from every dependency set joined so far.
    ///
    /// Later runs execute the body without tracking. Stopping twice is a
    /// no-op.
    pub fn stop(&self) {
        if !self.inner.active.replace(false) {
            return;
        }

        let deps = std::mem::take(&mut *self.inner.deps.borrow_mut());
        let mut left = 0;
        for dep in deps.iter().filter_map(WeakDep::upgrade) {
            if dep.remove(self.inner.id) {
                left += 1;
            }
        }
        tracing::debug!(deps = left, "effect stopped");
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.id
    }

    /// Number of tracked runs so far.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.get()
    }

    /// Number of dependency sets this effect has joined.
    pub fn dependency_count(&self) -> usize {
        self.inner
            .deps
            .borrow()
            .iter()
            .filter(|dep| dep.upgrade().is_some())
            .count()
    }
}

impl<T: 'static> Clone for ReactiveEffect<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Debug for ReactiveEffect<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveEffect")
            .field("id", &self.inner.id)
            .field("computed", &self.inner.computed)
            .field("active", &self.is_active())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .finish()
    }
}

/// Create an effect and, unless `options.lazy` is set, run it immediately.
///
/// Keep the returned handle: the effect is unsubscribed when it drops.
pub fn effect<T, F>(body: F, options: EffectOptions) -> ReactiveEffect<T>
where
    T: 'static,
    F: Fn() -> T + 'static,
{
    let effect = ReactiveEffect::new(body, options.scheduler);
    if !options.lazy {
        effect.run();
    }
    effect
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
