//! Loose value semantics used by the validation predicates.
//!
//! Rule definitions come from a dynamically typed front end, so predicates
//! compare values the way that front end does: missing fields are distinct
//! from `null`, numbers coerce from strings, and regexes test the string
//! form of any value. `None` always means "field not present".

use serde_json::Value;

use super::rule::ValueType;
use crate::domain::path::{PathSegment, PropertyPath};

/// Resolve a dotted/indexed path (`a.b[0].c` or `a.b.0.c`) inside `object`.
pub fn resolve_path<'a>(object: &'a Value, field: &str) -> Option<&'a Value> {
    if field.is_empty() {
        return Some(object);
    }

    let path = PropertyPath::parse(field);
    let mut current = object;
    for segment in path.segments() {
        current = match (segment, current) {
            (PathSegment::Property(name), Value::Object(map)) => map.get(name)?,
            (PathSegment::Property(name), Value::Array(items)) => {
                items.get(name.parse::<usize>().ok()?)?
            }
            (PathSegment::Index(idx), Value::Array(items)) => items.get(*idx)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Runtime type tag of a value; arrays and `null` report as objects.
pub fn type_of(value: Option<&Value>) -> ValueType {
    match value {
        None => ValueType::Undefined,
        Some(Value::String(_)) => ValueType::String,
        Some(Value::Number(_)) => ValueType::Number,
        Some(Value::Bool(_)) => ValueType::Boolean,
        Some(Value::Null | Value::Array(_) | Value::Object(_)) => ValueType::Object,
    }
}

pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

/// Missing, `null`, and zero-length strings, arrays and objects are empty.
/// `0` and `false` are values, not emptiness.
pub fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(Value::Bool(_) | Value::Number(_)) => false,
    }
}

/// Length of strings (in characters) and arrays; other values have none.
pub fn length(value: Option<&Value>) -> Option<usize> {
    match value {
        Some(Value::String(s)) => Some(s.chars().count()),
        Some(Value::Array(items)) => Some(items.len()),
        _ => None,
    }
}

/// Numeric coercion. Anything that cannot be read as a number is NaN.
pub fn to_number(value: Option<&Value>) -> f64 {
    match value {
        None => f64::NAN,
        Some(Value::Null) => 0.0,
        Some(Value::Bool(b)) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        Some(Value::Array(items)) => match items.as_slice() {
            [] => 0.0,
            [single] => to_number(Some(single)),
            _ => f64::NAN,
        },
        Some(Value::Object(_)) => f64::NAN,
    }
}

/// Largest magnitude below which every integral `f64` is exact.
pub(crate) const MAX_EXACT_INTEGER: f64 = 9.0e15;

/// String form used for pattern tests and message interpolation.
pub fn to_text(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => match n.as_f64() {
            // Integral floats print without a fraction while the cast is exact
            Some(f) if f.fract() == 0.0 && f.abs() < MAX_EXACT_INTEGER => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => to_text(Some(other)),
            })
            .collect::<Vec<_>>()
            .join(","),
        Some(Value::Object(_)) => "[object Object]".to_string(),
    }
}
