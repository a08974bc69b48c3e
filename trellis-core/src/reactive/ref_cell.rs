//! Ref Cells
//!
//! A [`Ref`] is a single reactive slot. It keeps the raw value it was given
//! and a display value: objects are shown through their tracked view,
//! primitives pass through unchanged.
//!
//! # How Refs Work
//!
//! 1. `get()` records the active subscriber in the ref's own dependency set
//!    and returns the display value.
//!
//! 2. `set()` compares the new value with the raw value using
//!    [`Value::same_value`]. Equal writes are dropped; anything else updates
//!    both values and notifies subscribers, computed-backed ones first.
//!
//! Mutating an object held by a ref goes through its view and notifies that
//! object's subscribers, not the ref's.

use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::dep::Dep;
use super::proxy::to_reactive;
use crate::value::Value;

/// Counter for generating unique ref IDs.
static REF_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

struct RefInner {
    id: u64,
    raw: RefCell<Value>,
    value: RefCell<Value>,
    dep: Dep,
}

/// A reactive slot holding one [`Value`].
///
/// # Example
///
/// ```rust,ignore
/// let count = Ref::new(0);
///
/// let value = count.get();
///
/// // Notifies subscribers
/// count.set(5);
/// ```
#[derive(Clone)]
pub struct Ref(Rc<RefInner>);

impl Ref {
    /// Create a ref. Given a ref, returns that same ref.
    pub fn new(value: impl Into<Value>) -> Self {
        match value.into() {
            Value::Ref(existing) => existing,
            value => {
                let raw = value.to_raw();
                let value = to_reactive(raw.clone());
                Self(Rc::new(RefInner {
                    id: REF_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
                    raw: RefCell::new(raw),
                    value: RefCell::new(value),
                    dep: Dep::new(),
                }))
            }
        }
    }

    /// Get the ref's unique ID.
    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn ptr_eq(&self, other: &Ref) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Read the display value and record the read.
    pub fn get(&self) -> Value {
        self.0.dep.track();
        self.0.value.borrow().clone()
    }

    /// Read the display value without recording a dependency.
    pub fn get_untracked(&self) -> Value {
        self.0.value.borrow().clone()
    }

    /// The raw value last written.
    pub fn raw(&self) -> Value {
        self.0.raw.borrow().clone()
    }

    /// Write a value. Does nothing if it is the same value as before.
    ///
    /// Views are compared and stored as their raw object.
    pub fn set(&self, value: impl Into<Value>) {
        let value = value.into().to_raw();
        if value.same_value(&self.0.raw.borrow()) {
            return;
        }

        let display = to_reactive(value.clone());
        let old_raw = self.0.raw.replace(value);
        let old_display = self.0.value.replace(display);
        drop((old_raw, old_display));

        tracing::trace!(id = self.0.id, subscribers = self.0.dep.len(), "ref changed");
        self.0.dep.trigger();
    }

    /// Update the value using a function of the current display value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&Value) -> Value,
    {
        let next = f(&self.get_untracked());
        self.set(next);
    }

    /// Notify subscribers without changing the value.
    pub fn trigger_ref(&self) {
        self.0.dep.trigger();
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.0.dep.len()
    }
}

impl PartialEq for Ref {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("id", &self.0.id)
            .field("value", &*self.0.value.borrow())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Create a ref cell, reusing `value` if it already is one.
pub fn create_ref(value: impl Into<Value>) -> Ref {
    Ref::new(value)
}

/// Whether `value` is a ref cell.
pub fn is_ref(value: &Value) -> bool {
    matches!(value, Value::Ref(_))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
