//! Computed Values
//!
//! A [`Computed`] is a lazily evaluated, cached value.
//!
//! # How Computed Values Work
//!
//! 1. The value starts dirty. Nothing runs until the first read.
//!
//! 2. A read records the reader in the computed value's own dependency set,
//!    then recomputes if dirty and returns the cache.
//!
//! 3. When an input changes, the internal effect's scheduler marks the value
//!    dirty and notifies its readers. It never recomputes there: the next
//!    read does. While already dirty, further input changes are ignored, so
//!    several writes before a read produce one notification and one
//!    recomputation.

use std::cell::{Cell, RefCell};
use std::fmt::{self, Debug};
use std::rc::{Rc, Weak};

use super::dep::Dep;
use super::effect::{ReactiveEffect, Scheduler};
use crate::error::{ReactivityError, Result};

/// Getter and setter for a writable computed value.
pub struct ComputedOptions<T> {
    pub get: Box<dyn Fn() -> T>,
    pub set: Box<dyn Fn(T)>,
}

impl<T> ComputedOptions<T> {
    pub fn new<G, S>(get: G, set: S) -> Self
    where
        G: Fn() -> T + 'static,
        S: Fn(T) + 'static,
    {
        Self {
            get: Box::new(get),
            set: Box::new(set),
        }
    }
}

struct ComputedInner<T: 'static> {
    dirty: Cell<bool>,
    value: RefCell<Option<T>>,
    dep: Dep,
    effect: ReactiveEffect<T>,
    setter: Option<Box<dyn Fn(T)>>,
}

/// A cached derived value that recomputes only after its inputs change.
pub struct Computed<T: 'static>(Rc<ComputedInner<T>>);

impl<T: Clone + 'static> Computed<T> {
    /// Create a read-only computed value.
    pub fn new<F>(getter: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self::build(Box::new(getter), None)
    }

    /// Create a computed value with a setter.
    pub fn with_options(options: ComputedOptions<T>) -> Self {
        Self::build(options.get, Some(options.set))
    }

    fn build(getter: Box<dyn Fn() -> T>, setter: Option<Box<dyn Fn(T)>>) -> Self {
        let inner = Rc::new_cyclic(|weak: &Weak<ComputedInner<T>>| {
            let weak = weak.clone();
            let scheduler: Scheduler = Rc::new(move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if !inner.dirty.get() {
                    inner.dirty.set(true);
                    inner.dep.trigger();
                }
            });

            ComputedInner {
                dirty: Cell::new(true),
                value: RefCell::new(None),
                dep: Dep::new(),
                effect: ReactiveEffect::new_computed(getter, scheduler),
                setter,
            }
        });
        Self(inner)
    }

    /// Read the value, recomputing first if it is dirty.
    ///
    /// # Panics
    ///
    /// Panics if the getter reads this same value before it has produced
    /// one. Use [`Computed::try_get`] where such a cycle is possible.
    pub fn get(&self) -> T {
        self.0.dep.track();
        unwrap_cycle(self.evaluate())
    }

    /// Read the value, or fail with [`ReactivityError::CyclicComputed`] when
    /// called from inside this value's own first evaluation.
    ///
    /// A getter that reads itself after the first evaluation sees the
    /// previous value.
    pub fn try_get(&self) -> Result<T> {
        self.0.dep.track();
        self.evaluate()
    }

    /// Read the value without recording a dependency.
    ///
    /// Panics under the same condition as [`Computed::get`].
    pub fn get_untracked(&self) -> T {
        unwrap_cycle(self.evaluate())
    }

    fn evaluate(&self) -> Result<T> {
        if self.0.dirty.replace(false) {
            let value = self.0.effect.run();
            let previous = self.0.value.replace(Some(value.clone()));
            drop(previous);
            return Ok(value);
        }

        match self.0.value.borrow().clone() {
            Some(value) => Ok(value),
            None => {
                tracing::warn!("computed value read during its own first evaluation");
                Err(ReactivityError::CyclicComputed)
            }
        }
    }

    /// Write through the setter.
    ///
    /// Fails with [`ReactivityError::ReadonlyComputed`] when the value was
    /// created without one.
    pub fn set(&self, value: T) -> Result<()> {
        match &self.0.setter {
            Some(setter) => {
                setter(value);
                Ok(())
            }
            None => {
                tracing::warn!("write operation failed: computed value is readonly");
                Err(ReactivityError::ReadonlyComputed)
            }
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.0.dirty.get()
    }

    /// Check if the value has been computed at least once.
    pub fn has_value(&self) -> bool {
        self.0.value.borrow().is_some()
    }

    /// Get the number of subscribers reading this value.
    pub fn dependent_count(&self) -> usize {
        self.0.dep.len()
    }

    /// The effect that evaluates the getter.
    pub fn effect(&self) -> &ReactiveEffect<T> {
        &self.0.effect
    }
}

fn unwrap_cycle<T>(value: Result<T>) -> T {
    match value {
        Ok(value) => value,
        Err(err) => panic!("{err}"),
    }
}

impl<T: 'static> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: Clone + Debug + 'static> Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("dirty", &self.is_dirty())
            .field("value", &*self.0.value.borrow())
            .field("dependent_count", &self.dependent_count())
            .finish()
    }
}

/// Create a read-only computed value.
pub fn computed<T, F>(getter: F) -> Computed<T>
where
    T: Clone + 'static,
    F: Fn() -> T + 'static,
{
    Computed::new(getter)
}

/// Create a computed value from a getter/setter pair.
pub fn computed_with<T: Clone + 'static>(options: ComputedOptions<T>) -> Computed<T> {
    Computed::with_options(options)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
