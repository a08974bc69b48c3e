//! Dynamic Values
//!
//! The engine observes arbitrary mutable records, so the data it tracks is
//! modelled as a dynamic [`Value`]. Records are [`Object`]s: reference-counted
//! property tables identified by reference, never by contents.
//!
//! # Properties
//!
//! A property is either plain data or an accessor (a getter with an optional
//! setter). Accessors receive the value they were read through, so a getter
//! invoked via a tracked view performs tracked reads itself. Lookups that miss
//! an object's own table continue along its prototype chain.
//!
//! # Equality
//!
//! [`Value::same_value`] follows `Object.is`: primitives compare by value
//! (`NaN` equals `NaN`, `0` and `-0.0` differ), everything else by identity.

use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use crate::error::{ReactivityError, Result};
use crate::reactive::{Reactive, Ref, Runtime};

/// Process-unique identity of an [`Object`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

type Getter = Rc<dyn Fn(&Value) -> Value>;
type Setter = Rc<dyn Fn(&Value, Value)>;

/// An accessor property: a getter and an optional setter.
///
/// Both receive the receiver the property was accessed through.
#[derive(Clone)]
pub struct Accessor {
    get: Getter,
    set: Option<Setter>,
}

/// A single property slot.
#[derive(Clone)]
pub enum Prop {
    Data(Value),
    Accessor(Accessor),
}

struct ObjectInner {
    id: ObjectId,
    props: RefCell<IndexMap<Rc<str>, Prop>>,
    proto: RefCell<Option<Object>>,
}

impl Drop for ObjectInner {
    fn drop(&mut self) {
        // Dependency sets keyed by this object can never fire again.
        Runtime::release(self.id);
    }
}

/// A raw mutable record.
///
/// Cloning an `Object` clones the handle, not the record. Reads and writes on
/// a raw object are untracked; wrap it with [`crate::reactive`] to observe it.
#[derive(Clone)]
pub struct Object(Rc<ObjectInner>);

impl Object {
    /// Create an empty record.
    pub fn new() -> Self {
        Self(Rc::new(ObjectInner {
            id: ObjectId::next(),
            props: RefCell::new(IndexMap::new()),
            proto: RefCell::new(None),
        }))
    }

    /// Create an empty record inheriting from `proto`.
    pub fn with_proto(proto: Object) -> Self {
        let object = Self::new();
        object.set_proto(Some(proto));
        object
    }

    /// Create a record from key/value pairs.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Rc<str>>,
        V: Into<Value>,
    {
        let object = Self::new();
        {
            let mut props = object.0.props.borrow_mut();
            for (key, value) in entries {
                props.insert(key.into(), Prop::Data(value.into()));
            }
        }
        object
    }

    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    /// Whether both handles point at the same record.
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn proto(&self) -> Option<Object> {
        self.0.proto.borrow().clone()
    }

    pub fn set_proto(&self, proto: Option<Object>) {
        *self.0.proto.borrow_mut() = proto;
    }

    /// Read a property (own or inherited). Missing keys read as `Undefined`.
    pub fn get(&self, key: &str) -> Value {
        self.get_with_receiver(key, &Value::Object(self.clone()))
    }

    /// Assign a property. Returns `true` if the key was added to this record.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> bool {
        self.set_with_receiver(key, value.into(), &Value::Object(self.clone()))
    }

    /// Define a read-only accessor property.
    pub fn define_getter<G>(&self, key: &str, get: G)
    where
        G: Fn(&Value) -> Value + 'static,
    {
        self.define(key, Accessor { get: Rc::new(get), set: None });
    }

    /// Define an accessor property with both a getter and a setter.
    pub fn define_accessor<G, S>(&self, key: &str, get: G, set: S)
    where
        G: Fn(&Value) -> Value + 'static,
        S: Fn(&Value, Value) + 'static,
    {
        self.define(
            key,
            Accessor {
                get: Rc::new(get),
                set: Some(Rc::new(set)),
            },
        );
    }

    fn define(&self, key: &str, accessor: Accessor) {
        self.0
            .props
            .borrow_mut()
            .insert(Rc::from(key), Prop::Accessor(accessor));
    }

    /// Whether the key exists on this record or its prototype chain.
    pub fn has(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    pub fn has_own(&self, key: &str) -> bool {
        self.0.props.borrow().contains_key(key)
    }

    /// Remove an own property. Returns `true` if it existed.
    pub fn delete(&self, key: &str) -> bool {
        let removed = self.0.props.borrow_mut().shift_remove(key);
        removed.is_some()
    }

    /// Own keys in insertion order.
    pub fn keys(&self) -> Vec<Rc<str>> {
        self.0.props.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.props.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find a property along the prototype chain.
    fn lookup(&self, key: &str) -> Option<Prop> {
        let mut current = Some(self.clone());
        while let Some(object) = current {
            if let Some(prop) = object.0.props.borrow().get(key) {
                return Some(prop.clone());
            }
            current = object.proto();
        }
        None
    }

    /// Read `key`, invoking accessors with `receiver` as their receiver.
    pub(crate) fn get_with_receiver(&self, key: &str, receiver: &Value) -> Value {
        // The table borrow is released before a getter runs; getters may
        // read this record again.
        match self.lookup(key) {
            Some(Prop::Data(value)) => value,
            Some(Prop::Accessor(accessor)) => (accessor.get)(receiver),
            None => Value::Undefined,
        }
    }

    /// Assign `key`, invoking an inherited or own setter with `receiver`.
    ///
    /// Returns `true` if a new own key was created.
    pub(crate) fn set_with_receiver(&self, key: &str, value: Value, receiver: &Value) -> bool {
        match self.lookup(key) {
            Some(Prop::Accessor(Accessor { set: Some(set), .. })) => {
                set(receiver, value);
                false
            }
            Some(Prop::Accessor(Accessor { set: None, .. })) => {
                tracing::trace!(object = self.id().raw(), key, "ignored write to getter-only property");
                false
            }
            _ => {
                let previous = self
                    .0
                    .props
                    .borrow_mut()
                    .insert(Rc::from(key), Prop::Data(value));
                previous.is_none()
            }
        }
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("id", &self.id().raw())
            .field("keys", &self.keys())
            .finish()
    }
}

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
    /// Absence of a value: missing properties, the first old value of a watch.
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    /// A raw, untracked record.
    Object(Object),
    /// A tracked view over a record.
    Reactive(Reactive),
    /// A ref cell.
    Ref(Ref),
}

impl Value {
    /// `Object.is` comparison.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => object_is(*a, *b),
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                int_is_float(*a, *b)
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Reactive(a), Value::Reactive(b)) => a.ptr_eq(b),
            (Value::Ref(a), Value::Ref(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Whether this is a record, raw or tracked.
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Reactive(_))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Read a property through this value.
    ///
    /// Tracked views record the read; raw objects do not. Anything else has
    /// no properties and reads as `Undefined`.
    pub fn get(&self, key: &str) -> Value {
        match self {
            Value::Object(object) => object.get(key),
            Value::Reactive(view) => view.get(key),
            _ => Value::Undefined,
        }
    }

    /// Assign a property through this value.
    ///
    /// Writes through a tracked view notify subscribers. Values without
    /// properties ignore the write.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        match self {
            Value::Object(object) => {
                object.set(key, value);
            }
            Value::Reactive(view) => view.set(key, value),
            _ => {}
        }
    }

    /// Strip the tracked view, if any.
    pub fn to_raw(&self) -> Value {
        match self {
            Value::Reactive(view) => Value::Object(view.raw()),
            other => other.clone(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of `Int` and `Float`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_reactive(&self) -> Option<&Reactive> {
        match self {
            Value::Reactive(view) => Some(view),
            _ => None,
        }
    }

    pub fn as_ref_cell(&self) -> Option<&Ref> {
        match self {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }

    /// Snapshot this value as JSON without tracking.
    ///
    /// Tracked views and refs are unwrapped, accessors are evaluated and
    /// `Undefined` properties are omitted. Fails on reference cycles.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let mut path = Vec::new();
        to_json_inner(self, &mut path)
    }
}

fn object_is(a: f64, b: f64) -> bool {
    if a.is_nan() && b.is_nan() {
        return true;
    }
    a == b && (a != 0.0 || a.is_sign_negative() == b.is_sign_negative())
}

/// Exact `Int`/`Float` comparison. An `Int` is a positive-zero number, and
/// only whole floats inside the `i64` range can equal one.
fn int_is_float(i: i64, f: f64) -> bool {
    // 2^63, the first float past `i64::MAX`.
    const I64_END: f64 = 9_223_372_036_854_775_808.0;

    if f.fract() != 0.0 || f < i64::MIN as f64 || f >= I64_END {
        return false;
    }
    if f == 0.0 && f.is_sign_negative() {
        return false;
    }
    f as i64 == i
}

fn to_json_inner(value: &Value, path: &mut Vec<ObjectId>) -> Result<serde_json::Value> {
    use serde_json::Value as Json;

    let object = match value {
        Value::Undefined | Value::Null => return Ok(Json::Null),
        Value::Bool(b) => return Ok(Json::Bool(*b)),
        Value::Int(i) => return Ok(Json::from(*i)),
        Value::Float(f) => {
            return Ok(serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null))
        }
        Value::Str(s) => return Ok(Json::String(s.to_string())),
        Value::Ref(r) => return to_json_inner(&r.raw(), path),
        Value::Reactive(view) => view.raw(),
        Value::Object(object) => object.clone(),
    };

    if path.contains(&object.id()) {
        return Err(ReactivityError::CyclicValue {
            object: object.id().raw(),
        });
    }
    path.push(object.id());

    let receiver = Value::Object(object.clone());
    let mut map = serde_json::Map::new();
    for key in object.keys() {
        let field = object.get_with_receiver(&key, &receiver);
        if field.is_undefined() {
            continue;
        }
        map.insert(key.to_string(), to_json_inner(&field, path)?);
    }

    path.pop();
    Ok(Json::Object(map))
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same_value(other)
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Object(object) => object.fmt(f),
            Value::Reactive(view) => view.fmt(f),
            Value::Ref(r) => r.fmt(f),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(Rc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Rc::from(value))
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Value::Object(value)
    }
}

impl From<Reactive> for Value {
    fn from(value: Reactive) -> Self {
        Value::Reactive(value)
    }
}

impl From<Ref> for Value {
    fn from(value: Ref) -> Self {
        Value::Ref(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Builds raw objects from JSON. Arrays become records keyed `"0"`, `"1"`, ...
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::from(s),
            Json::Array(items) => Value::Object(Object::from_entries(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| (index.to_string(), Value::from(item))),
            )),
            Json::Object(fields) => Value::Object(Object::from_entries(
                fields.into_iter().map(|(key, item)| (key, Value::from(item))),
            )),
        }
    }
}
