//! Tracked Views
//!
//! A [`Reactive`] is a tracked view over a raw [`Object`]. Rust has no
//! runtime property trapping, so instead of intercepting plain field access
//! the view exposes explicit entry points: every `get`/`has`/`keys` records
//! the active subscriber, every `set`/`delete` notifies. Callers must go
//! through the view; reads and writes on the raw object stay invisible.
//!
//! # Identity
//!
//! Wrapping is idempotent: [`reactive`] returns the live view for an object
//! if there is one. The proxy map holds views weakly, so a view disappears
//! with its last handle and the map never keeps objects alive.
//!
//! # Nested Objects
//!
//! Reading a property that holds a raw object returns that object's view,
//! so reads at any depth are tracked. Writing a view stores its raw object.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::rc::{Rc, Weak};

use super::runtime::{Runtime, TrackKey};
use crate::value::{Object, ObjectId, Value};

thread_local! {
    static PROXY_MAP: RefCell<HashMap<ObjectId, Weak<ReactiveInner>>> = RefCell::new(HashMap::new());
}

struct ReactiveInner {
    target: Object,
}

impl Drop for ReactiveInner {
    fn drop(&mut self) {
        let id = self.target.id();
        let _ = PROXY_MAP.try_with(|map| {
            if let Ok(mut map) = map.try_borrow_mut() {
                if map.get(&id).is_some_and(|view| view.strong_count() == 0) {
                    map.remove(&id);
                }
            }
        });
    }
}

/// A tracked view over a raw object.
#[derive(Clone)]
pub struct Reactive(Rc<ReactiveInner>);

impl Reactive {
    /// The raw object behind this view.
    pub fn raw(&self) -> Object {
        self.0.target.clone()
    }

    /// Identity of the raw object.
    pub fn id(&self) -> ObjectId {
        self.0.target.id()
    }

    pub fn ptr_eq(&self, other: &Reactive) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn receiver(&self) -> Value {
        Value::Reactive(self.clone())
    }

    /// Read a property and record the read.
    ///
    /// Accessors run with this view as receiver, so their own reads are
    /// tracked as well. Object values come back as views.
    pub fn get(&self, key: &str) -> Value {
        let value = self.0.target.get_with_receiver(key, &self.receiver());
        Runtime::track(self.id(), TrackKey::from(key));
        to_reactive(value)
    }

    /// Assign a property and notify its subscribers.
    ///
    /// Every write notifies, even when the value did not change. Adding a
    /// new key also notifies enumerations.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        let added = self
            .0
            .target
            .set_with_receiver(key, value.to_raw(), &self.receiver());

        tracing::trace!(object = self.id().raw(), key, added, "tracked write");
        Runtime::trigger(self.id(), &TrackKey::from(key));
        if added {
            Runtime::trigger(self.id(), &TrackKey::Iterate);
        }
    }

    /// Whether the key exists (own or inherited). Records the read.
    pub fn has(&self, key: &str) -> bool {
        Runtime::track(self.id(), TrackKey::from(key));
        self.0.target.has(key)
    }

    /// Remove an own property, notifying the key and enumerations.
    pub fn delete(&self, key: &str) -> bool {
        let removed = self.0.target.delete(key);
        if removed {
            Runtime::trigger(self.id(), &TrackKey::from(key));
            Runtime::trigger(self.id(), &TrackKey::Iterate);
        }
        removed
    }

    /// Own keys in insertion order. Records an enumeration.
    pub fn keys(&self) -> Vec<Rc<str>> {
        Runtime::track(self.id(), TrackKey::Iterate);
        self.0.target.keys()
    }

    /// Number of own keys. Records an enumeration.
    pub fn len(&self) -> usize {
        Runtime::track(self.id(), TrackKey::Iterate);
        self.0.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PartialEq for Reactive {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Reactive").field(&self.0.target).finish()
    }
}

/// Return the tracked view for `target`, creating it on first use.
pub fn reactive(target: &Object) -> Reactive {
    let id = target.id();
    let existing = PROXY_MAP.with(|map| map.borrow().get(&id).and_then(Weak::upgrade));
    if let Some(view) = existing {
        return Reactive(view);
    }

    let view = Rc::new(ReactiveInner {
        target: target.clone(),
    });
    PROXY_MAP.with(|map| map.borrow_mut().insert(id, Rc::downgrade(&view)));
    Reactive(view)
}

/// Whether `value` is a tracked view.
pub fn is_reactive(value: &Value) -> bool {
    matches!(value, Value::Reactive(_))
}

/// Wrap raw objects in their view; pass everything else through.
pub fn to_reactive(value: Value) -> Value {
    match value {
        Value::Object(object) => Value::Reactive(reactive(&object)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{effect, EffectOptions};
    use serde_json::json;
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<usize>>, impl Fn() + Clone) {
        let count = Rc::new(Cell::new(0));
        let bump = {
            let count = count.clone();
            move || count.set(count.get() + 1)
        };
        (count, bump)
    }

    #[test]
    fn wrapping_is_identity_stable() {
        let object = Object::new();
        let a = reactive(&object);
        let b = reactive(&object);
        assert!(a.ptr_eq(&b));
        assert!(reactive(&a.raw()).ptr_eq(&a));

        let other = reactive(&Object::new());
        assert!(!a.ptr_eq(&other));
    }

    #[test]
    fn dropped_views_leave_the_proxy_map() {
        let object = Object::new();
        let id = object.id();
        drop(reactive(&object));
        assert!(PROXY_MAP.with(|map| !map.borrow().contains_key(&id)));
    }

    #[test]
    fn is_reactive_marks_views_only() {
        let object = Object::new();
        assert!(!is_reactive(&Value::from(object.clone())));
        assert!(is_reactive(&Value::from(reactive(&object))));
        assert!(!is_reactive(&Value::Int(1)));
    }

    #[test]
    fn reads_and_writes_behave_like_the_raw_object() {
        let object = Object::from_entries([("a", 1)]);
        let view = reactive(&object);

        assert_eq!(view.get("a"), Value::Int(1));
        view.set("a", 2);
        view.set("b", "new");
        assert_eq!(object.get("a"), Value::Int(2));
        assert_eq!(view.get("b"), Value::from("new"));
        assert_eq!(view.get("missing"), Value::Undefined);
        assert!(view.has("b"));
    }

    #[test]
    fn every_write_notifies_even_when_equal() {
        let view = reactive(&Object::from_entries([("x", 1)]));
        let (runs, bump) = counter();

        let _effect = {
            let view = view.clone();
            effect(
                move || {
                    view.get("x");
                    bump();
                },
                EffectOptions::default(),
            )
        };

        view.set("x", 1);
        view.set("x", 1);
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn nested_objects_are_tracked() {
        let Value::Object(object) = Value::from(json!({ "user": { "name": "ada" } })) else {
            panic!("expected object");
        };
        let view = reactive(&object);
        let (runs, bump) = counter();

        let user = view.get("user");
        assert!(is_reactive(&user));

        let _effect = {
            let view = view.clone();
            effect(
                move || {
                    view.get("user").get("name");
                    bump();
                },
                EffectOptions::default(),
            )
        };

        user.set("name", "grace");
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn storing_a_view_stores_the_raw_object() {
        let parent = reactive(&Object::new());
        let child = reactive(&Object::new());
        parent.set("child", child.clone());

        assert!(matches!(parent.raw().get("child"), Value::Object(_)));
        assert_eq!(parent.get("child"), Value::Reactive(child));
    }

    #[test]
    fn enumeration_tracks_added_and_removed_keys() {
        let view = reactive(&Object::from_entries([("a", 1)]));
        let (runs, bump) = counter();

        let _effect = {
            let view = view.clone();
            effect(
                move || {
                    view.keys();
                    bump();
                },
                EffectOptions::default(),
            )
        };

        view.set("a", 2); // existing key, no enumeration change
        assert_eq!(runs.get(), 1);

        view.set("b", 1);
        assert_eq!(runs.get(), 2);

        assert!(view.delete("a"));
        assert_eq!(runs.get(), 3);

        assert!(!view.delete("a"));
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn inherited_getters_track_through_the_view() {
        let proto = Object::new();
        proto.define_getter("double", |this| {
            Value::Int(this.get("n").as_int().unwrap_or(0) * 2)
        });
        let view = reactive(&Object::with_proto(proto));
        view.set("n", 2);

        let seen = Rc::new(Cell::new(0));
        let _effect = {
            let (view, seen) = (view.clone(), seen.clone());
            effect(
                move || seen.set(view.get("double").as_int().unwrap_or(-1)),
                EffectOptions::default(),
            )
        };
        assert_eq!(seen.get(), 4);

        view.set("n", 5);
        assert_eq!(seen.get(), 10);
    }
}
