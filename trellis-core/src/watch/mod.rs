//! Watchers
//!
//! A watcher pairs a [`ReactiveEffect`] that reads a source with a user
//! callback receiving `(new, old)` values. Changes never call back from
//! inside the write: the effect's scheduler queues a [`Job`] on the
//! batching scheduler, so a burst of writes produces one callback per tick.
//!
//! # Sources
//!
//! - A [`Reactive`] view is always watched deeply: every property reachable
//!   from it is read through [`traverse`], so a write anywhere in the graph
//!   fires the watcher. The callback receives the view itself as both the
//!   new and the old value.
//! - A [`Ref`] is watched through its value; nested objects only count when
//!   `deep` is set.
//! - A getter closure is watched through whatever it reads.
//!
//! The first old value is [`Value::Undefined`].

mod traverse;

use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::rc::Rc;

use crate::reactive::{Reactive, ReactiveEffect, Ref, Scheduler};
use crate::scheduler::{queue_job, Job};
use crate::value::Value;

pub use traverse::traverse;

/// What a watcher observes.
#[derive(Clone)]
pub enum WatchSource {
    Reactive(Reactive),
    Ref(Ref),
    Getter(Rc<dyn Fn() -> Value>),
    /// Nothing to observe. The watcher never fires.
    None,
}

impl WatchSource {
    pub fn getter<F>(f: F) -> Self
    where
        F: Fn() -> Value + 'static,
    {
        WatchSource::Getter(Rc::new(f))
    }
}

impl From<Reactive> for WatchSource {
    fn from(view: Reactive) -> Self {
        WatchSource::Reactive(view)
    }
}

impl From<Ref> for WatchSource {
    fn from(cell: Ref) -> Self {
        WatchSource::Ref(cell)
    }
}

impl From<Value> for WatchSource {
    fn from(value: Value) -> Self {
        match value {
            Value::Reactive(view) => WatchSource::Reactive(view),
            Value::Ref(cell) => WatchSource::Ref(cell),
            _ => WatchSource::None,
        }
    }
}

impl Debug for WatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchSource::Reactive(view) => f.debug_tuple("Reactive").field(view).finish(),
            WatchSource::Ref(cell) => f.debug_tuple("Ref").field(cell).finish(),
            WatchSource::Getter(_) => f.write_str("Getter(..)"),
            WatchSource::None => f.write_str("None"),
        }
    }
}

/// Options for [`watch`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchOptions {
    /// Call back once at construction, before anything changes.
    pub immediate: bool,

    /// Read the whole graph reachable from the source, and call back on
    /// every change even when the top-level value is the same.
    pub deep: bool,
}

impl WatchOptions {
    pub fn immediate() -> Self {
        Self {
            immediate: true,
            deep: false,
        }
    }

    pub fn deep() -> Self {
        Self {
            immediate: false,
            deep: true,
        }
    }
}

struct WatchState {
    effect: RefCell<Option<ReactiveEffect<Value>>>,
    old: RefCell<Value>,
    callback: Box<dyn Fn(&Value, &Value)>,
    deep: bool,
}

impl WatchState {
    /// Re-read the source and call back if it changed.
    fn fire(&self, initial: bool) {
        let effect = match self.effect.borrow().as_ref() {
            Some(effect) if effect.is_active() => effect.clone(),
            _ => return,
        };

        let new = effect.run();
        if !initial && !self.deep && new.same_value(&self.old.borrow()) {
            return;
        }
        let old = self.old.replace(new.clone());
        (self.callback)(&new, &old);
    }
}

/// Handle returned by [`watch`].
///
/// The watcher lives as long as its handle. Dropping the handle stops it.
#[must_use = "a watcher stops when its handle is dropped"]
pub struct WatchHandle {
    state: Rc<WatchState>,
}

impl WatchHandle {
    /// Stop watching. Jobs already queued for this watcher do nothing.
    pub fn stop(&self) {
        if let Some(effect) = self.state.effect.borrow_mut().take() {
            effect.stop();
        }
    }

    pub fn is_active(&self) -> bool {
        self.state
            .effect
            .borrow()
            .as_ref()
            .is_some_and(ReactiveEffect::is_active)
    }
}

impl Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("active", &self.is_active())
            .field("deep", &self.state.deep)
            .finish()
    }
}

/// Watch `source` and call `callback(new, old)` after it changes.
///
/// Callbacks are delivered by the batching scheduler, at the next flush
/// after the change. With `options.immediate` the callback also runs once
/// synchronously, with [`Value::Undefined`] as the old value.
///
/// # Example
///
/// ```rust,ignore
/// let count = Ref::new(0);
/// let handle = watch(count.clone(), |new, old| println!("{old:?} -> {new:?}"), WatchOptions::default());
///
/// count.set(1);
/// count.set(2);
/// flush_jobs();  // Prints "Int(0) -> Int(2)" once
/// ```
pub fn watch<S, F>(source: S, callback: F, options: WatchOptions) -> WatchHandle
where
    S: Into<WatchSource>,
    F: Fn(&Value, &Value) + 'static,
{
    let mut deep = options.deep;
    let getter: Box<dyn Fn() -> Value> = match source.into() {
        WatchSource::Reactive(view) => {
            deep = true;
            Box::new(move || Value::Reactive(view.clone()))
        }
        WatchSource::Ref(cell) => Box::new(move || cell.get()),
        WatchSource::Getter(f) => Box::new(move || f()),
        WatchSource::None => {
            tracing::warn!("watch source is neither reactive nor a ref; the watcher never fires");
            Box::new(|| Value::Undefined)
        }
    };
    let getter: Box<dyn Fn() -> Value> = if deep {
        Box::new(move || traverse(getter()))
    } else {
        getter
    };

    let state = Rc::new(WatchState {
        effect: RefCell::new(None),
        old: RefCell::new(Value::Undefined),
        callback: Box::new(callback),
        deep,
    });

    let job = {
        let state = Rc::downgrade(&state);
        Job::new(move || {
            if let Some(state) = state.upgrade() {
                state.fire(false);
            }
        })
    };
    let scheduler: Scheduler = Rc::new(move || queue_job(job.clone()));
    let effect = ReactiveEffect::new(getter, Some(scheduler));
    *state.effect.borrow_mut() = Some(effect.clone());

    if options.immediate {
        state.fire(true);
    } else {
        *state.old.borrow_mut() = effect.run();
    }

    tracing::trace!(deep, immediate = options.immediate, "watcher created");
    WatchHandle { state }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::reactive;
    use crate::scheduler::{flush_jobs, next_tick};
    use crate::value::Object;

    type Calls = Rc<RefCell<Vec<(Value, Value)>>>;

    fn recorder() -> (Calls, impl Fn(&Value, &Value) + 'static) {
        let calls: Calls = Rc::new(RefCell::new(Vec::new()));
        let sink = calls.clone();
        (calls, move |new: &Value, old: &Value| {
            sink.borrow_mut().push((new.clone(), old.clone()))
        })
    }

    #[test]
    fn writes_in_one_tick_coalesce() {
        let count = Ref::new(1);
        let (calls, callback) = recorder();
        let _handle = watch(count.clone(), callback, WatchOptions::default());

        count.set(2);
        count.set(3);
        assert!(calls.borrow().is_empty());

        flush_jobs();
        assert_eq!(*calls.borrow(), vec![(Value::Int(3), Value::Int(1))]);
    }

    #[test]
    fn unchanged_value_is_not_reported() {
        let count = Ref::new(1);
        let (calls, callback) = recorder();
        let _handle = watch(count.clone(), callback, WatchOptions::default());

        count.set(2);
        count.set(1);
        flush_jobs();
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn immediate_calls_back_with_undefined_old_value() {
        let count = Ref::new(7);
        let (calls, callback) = recorder();
        let _handle = watch(count.clone(), callback, WatchOptions::immediate());

        assert_eq!(*calls.borrow(), vec![(Value::Int(7), Value::Undefined)]);

        count.set(8);
        flush_jobs();
        assert_eq!(calls.borrow().len(), 2);
        assert_eq!(calls.borrow()[1], (Value::Int(8), Value::Int(7)));
    }

    #[test]
    fn reactive_source_is_watched_deeply() {
        let inner = Object::from_entries([("n", 1)]);
        let state = reactive(&Object::from_entries([("inner", inner)]));
        let (calls, callback) = recorder();
        let _handle = watch(state.clone(), callback, WatchOptions::default());

        state.get("inner").set("n", 2);
        flush_jobs();

        let calls = calls.borrow();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.as_reactive().is_some_and(|view| view.ptr_eq(&state)));
    }

    #[test]
    fn deep_ref_source_sees_nested_writes() {
        let cell = Ref::new(Object::from_entries([("n", 1)]));
        let (shallow_calls, shallow) = recorder();
        let (deep_calls, deep) = recorder();
        let _shallow = watch(cell.clone(), shallow, WatchOptions::default());
        let _deep = watch(cell.clone(), deep, WatchOptions::deep());

        cell.get_untracked().set("n", 2);
        flush_jobs();

        assert!(shallow_calls.borrow().is_empty());
        assert_eq!(deep_calls.borrow().len(), 1);
    }

    #[test]
    fn getter_source() {
        let a = Ref::new(1);
        let b = Ref::new(2);
        let (calls, callback) = recorder();
        let _handle = {
            let (a, b) = (a.clone(), b.clone());
            watch(
                WatchSource::getter(move || {
                    let sum = a.get().as_int().unwrap_or(0) + b.get().as_int().unwrap_or(0);
                    Value::Int(sum)
                }),
                callback,
                WatchOptions::default(),
            )
        };

        a.set(10);
        flush_jobs();
        assert_eq!(*calls.borrow(), vec![(Value::Int(12), Value::Int(3))]);
    }

    #[test]
    fn stop_prevents_later_callbacks() {
        let count = Ref::new(0);
        let (calls, callback) = recorder();
        let handle = watch(count.clone(), callback, WatchOptions::default());

        count.set(1);
        handle.stop();
        assert!(!handle.is_active());
        flush_jobs();

        count.set(2);
        flush_jobs();
        assert!(calls.borrow().is_empty());
        assert_eq!(count.subscriber_count(), 0);
    }

    #[test]
    fn dropped_handle_stops_watching() {
        let object = Object::from_entries([("n", 1)]);
        let id = object.id();
        let (calls, callback) = recorder();
        let handle = watch(reactive(&object), callback, WatchOptions::default());
        assert!(crate::reactive::Runtime::is_tracked(id));

        reactive(&object).set("n", 2);
        drop(handle);
        flush_jobs();
        assert!(calls.borrow().is_empty());

        drop(object);
        assert!(!crate::reactive::Runtime::is_tracked(id));
    }

    #[test]
    fn none_source_never_fires() {
        let (calls, callback) = recorder();
        let handle = watch(WatchSource::None, callback, WatchOptions::default());
        assert!(handle.is_active());
        flush_jobs();
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn cyclic_graph_terminates() {
        let a = Object::new();
        let b = Object::from_entries([("a", a.clone())]);
        a.set("b", b.clone());
        let view = reactive(&a);

        let (calls, callback) = recorder();
        let handle = watch(view.clone(), callback, WatchOptions::default());

        view.get("b").set("x", 1);
        flush_jobs();
        assert_eq!(calls.borrow().len(), 1);

        handle.stop();
        a.delete("b");
    }

    #[tokio::test]
    async fn callbacks_arrive_on_next_tick() {
        let count = Ref::new(0);
        let (calls, callback) = recorder();
        let _handle = watch(count.clone(), callback, WatchOptions::default());

        count.set(5);
        assert!(calls.borrow().is_empty());

        next_tick().await;
        assert_eq!(*calls.borrow(), vec![(Value::Int(5), Value::Int(0))]);
    }
}
