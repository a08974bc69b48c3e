//! Deep Traversal
//!
//! Visits every property reachable from a value, purely to perform a
//! tracked read at every level. Run inside a watcher's effect, this
//! subscribes the watcher to the whole object graph.
//!
//! Each object and ref is visited once, so graphs with reference cycles
//! terminate.

use std::collections::HashSet;

use crate::value::{ObjectId, Value};

#[derive(PartialEq, Eq, Hash)]
enum Visited {
    Object(ObjectId),
    Ref(u64),
}

/// Read every property reachable from `value`, then return it.
pub fn traverse(value: Value) -> Value {
    let mut seen = HashSet::new();
    visit(&value, &mut seen);
    value
}

fn visit(value: &Value, seen: &mut HashSet<Visited>) {
    match value {
        Value::Reactive(view) => {
            if !seen.insert(Visited::Object(view.id())) {
                return;
            }
            for key in view.keys() {
                visit(&view.get(&key), seen);
            }
        }
        Value::Object(object) => {
            if !seen.insert(Visited::Object(object.id())) {
                return;
            }
            for key in object.keys() {
                visit(&object.get(&key), seen);
            }
        }
        Value::Ref(cell) => {
            if seen.insert(Visited::Ref(cell.id())) {
                visit(&cell.get(), seen);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{reactive, ReactiveEffect, Ref, Runtime, TrackKey};
    use crate::value::Object;

    #[test]
    fn tracks_every_level() {
        let leaf = Object::from_entries([("n", 1)]);
        let root = Object::from_entries([("child", leaf.clone())]);
        let view = reactive(&root);

        let effect = {
            let view = view.clone();
            ReactiveEffect::new(move || traverse(Value::Reactive(view.clone())), None)
        };
        effect.run();

        let leaf_dep = Runtime::dep(leaf.id(), &TrackKey::from("n")).unwrap();
        assert!(leaf_dep.contains(effect.subscriber_id()));
        let iterate = Runtime::dep(root.id(), &TrackKey::Iterate).unwrap();
        assert!(iterate.contains(effect.subscriber_id()));
    }

    #[test]
    fn cyclic_graphs_terminate() {
        let a = Object::new();
        let b = Object::from_entries([("a", a.clone())]);
        a.set("b", b.clone());

        let result = traverse(Value::Reactive(reactive(&a)));
        assert!(matches!(result, Value::Reactive(_)));

        // Break the cycle so both objects can be reclaimed.
        a.delete("b");
    }

    #[test]
    fn refs_are_unwrapped() {
        let cell = Ref::new(Object::from_entries([("n", 1)]));
        let effect = {
            let cell = cell.clone();
            ReactiveEffect::new(move || traverse(Value::Ref(cell.clone())), None)
        };
        effect.run();
        assert_eq!(cell.subscriber_count(), 1);
    }

    #[test]
    fn primitives_pass_through() {
        assert_eq!(traverse(Value::Int(3)), Value::Int(3));
    }
}
