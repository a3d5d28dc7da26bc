//! Field registry: the form-state controller the renderer drives.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::domain::path::{PathSegment, PropertyPath};

/// Form-state controller injected into the renderer.
///
/// Leaves register as they mount and unregister as they unmount; only
/// registered values reach the submission.
pub trait FieldRegistry {
    fn register(&mut self, path: &PropertyPath, initial: Value);

    fn unregister(&mut self, path: &PropertyPath);

    /// Update a registered field. Returns false if the path is unknown.
    fn set_value(&mut self, path: &PropertyPath, value: Value) -> bool;

    fn value(&self, path: &PropertyPath) -> Option<&Value>;

    fn is_registered(&self, path: &PropertyPath) -> bool {
        self.value(path).is_some()
    }

    /// All registered fields in path order.
    fn values(&self) -> Vec<(PropertyPath, Value)>;
}

/// In-memory registry keyed by property path.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    fields: BTreeMap<PropertyPath, Value>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FieldRegistry for FormState {
    fn register(&mut self, path: &PropertyPath, initial: Value) {
        self.fields.insert(path.clone(), initial);
    }

    fn unregister(&mut self, path: &PropertyPath) {
        self.fields.remove(path);
    }

    fn set_value(&mut self, path: &PropertyPath, value: Value) -> bool {
        match self.fields.get_mut(path) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    fn value(&self, path: &PropertyPath) -> Option<&Value> {
        self.fields.get(path)
    }

    fn values(&self) -> Vec<(PropertyPath, Value)> {
        self.fields
            .iter()
            .map(|(path, value)| (path.clone(), value.clone()))
            .collect()
    }
}

/// Assemble a nested object from registered field values. Null values are
/// left out; array slots below a present entry are padded with null.
pub fn build_submission(values: &[(PropertyPath, Value)]) -> Value {
    let mut root = Value::Object(Map::new());
    for (path, value) in values {
        if value.is_null() || path.is_root() {
            continue;
        }
        let segments: Vec<&PathSegment> = path.segments().collect();
        insert_at(&mut root, &segments, value.clone());
    }
    root
}

fn insert_at(target: &mut Value, segments: &[&PathSegment], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *target = value;
        return;
    };

    let slot = match first {
        PathSegment::Property(name) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            match target {
                Value::Object(map) => map.entry(name.clone()).or_insert(Value::Null),
                _ => return,
            }
        }
        PathSegment::Index(idx) => {
            if !target.is_array() {
                *target = Value::Array(Vec::new());
            }
            match target {
                Value::Array(items) => {
                    if items.len() <= *idx {
                        items.resize(*idx + 1, Value::Null);
                    }
                    &mut items[*idx]
                }
                _ => return,
            }
        }
    };
    insert_at(slot, rest, value);
}
