//! Chain evaluation.
//!
//! Rules run in order and the first failing rule ends the chain. Inside a
//! rule every applicable predicate is checked against the value and the last
//! one that fails supplies the message; with `asArray` the elements are
//! checked in order and the first failing element ends the rule.

use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, trace};

use super::coerce;
use super::rule::{FieldSelector, Validation, ValidationRule};

/// Returned when there is nothing to validate.
pub const EMPTY_INPUT_MESSAGE: &str = "Object or validations is empty";

/// Human-readable names for fields, keyed by the rule's field name.
pub type FieldLabels = HashMap<String, String>;

/// Evaluate `rules` against `object`, returning the first failure message.
///
/// A `null` object or an empty rule list is reported with
/// [`EMPTY_INPUT_MESSAGE`]; an empty JSON object is a normal input.
pub fn chain_validations(
    object: &Value,
    rules: &[ValidationRule],
    labels: Option<&FieldLabels>,
) -> Option<String> {
    if object.is_null() || rules.is_empty() {
        return Some(EMPTY_INPUT_MESSAGE.to_string());
    }

    for (index, rule) in rules.iter().enumerate() {
        if let Some(guard) = &rule.validate_if {
            let current = coerce::resolve_path(object, &guard.field);
            if !guard.condition.holds(current) {
                trace!(rule = index, guard = %guard.field, "validateIf not met, skipping rule");
                continue;
            }
        }

        if let Some(message) = apply_rule(object, rule, labels) {
            debug!(rule = index, %message, "validation chain failed");
            return Some(message);
        }
    }

    None
}

fn apply_rule(object: &Value, rule: &ValidationRule, labels: Option<&FieldLabels>) -> Option<String> {
    match &rule.field {
        FieldSelector::Name(field) => {
            let value = if field.is_empty() {
                Some(object)
            } else if rule.validation.disallow_dot_split {
                object.get(field.as_str())
            } else {
                coerce::resolve_path(object, field)
            };
            validate_field(value, field, &rule.validation, labels)
        }
        FieldSelector::Matching { pattern } => {
            let map = object.as_object()?;
            map.iter()
                .filter(|(key, _)| pattern.is_match(key))
                .find_map(|(key, value)| validate_field(Some(value), key, &rule.validation, labels))
        }
    }
}

fn validate_field(
    value: Option<&Value>,
    field: &str,
    validation: &Validation,
    labels: Option<&FieldLabels>,
) -> Option<String> {
    let label = labels
        .and_then(|l| l.get(field))
        .cloned()
        .unwrap_or_else(|| format!("[{}]", field));

    let error = if validation.as_array {
        match value {
            Some(Value::Array(items)) => items
                .iter()
                .find_map(|item| check_value(Some(item), validation, &label)),
            _ => Some(format!("{} must be an array", label)),
        }
    } else {
        check_value(value, validation, &label)
    };

    error.map(|generated| validation.custom_error.clone().unwrap_or(generated))
}

/// Run every predicate against one value. Later failures overwrite earlier
/// ones.
fn check_value(value: Option<&Value>, v: &Validation, label: &str) -> Option<String> {
    let mut error = None;

    if v.exists && value.is_none() {
        error = Some(format!("{} does not exist", label));
    }

    if let Some(expected) = v.of_type {
        if coerce::type_of(value) != expected {
            error = Some(format!("{} is an invalid type, should be \"{}\"", label, expected));
        }
    }

    if v.not_empty && coerce::is_empty(value) {
        error = Some(format!("{} is empty", label));
    }

    let len = coerce::length(value);
    if let (Some(min), Some(len)) = (v.length_min, len) {
        if len < min {
            error = Some(format!("{} must have a length of at least {}", label, min));
        }
    }
    if let (Some(max), Some(len)) = (v.length_max, len) {
        if len > max {
            error = Some(format!("{} must have a length of at most {}", label, max));
        }
    }
    if let (Some(exact), Some(len)) = (v.has_length, len) {
        if len != exact {
            error = Some(format!("{} must have a length of exactly {}", label, exact));
        }
    }

    if let Some(options) = &v.enum_values {
        if !value.is_some_and(|val| options.contains(val)) {
            let allowed: Vec<String> = options.iter().map(|o| coerce::to_text(Some(o))).collect();
            error = Some(format!("{} must be one of: {}", label, allowed.join(", ")));
        }
    }

    if let Some(set) = &v.in_set {
        if !value.is_some_and(|val| set.contains(val)) {
            error = Some(format!("{} is not an allowed value", label));
        }
    }

    // The numeric guard accepts every value; NaN simply never compares past
    // a bound.
    let number = coerce::to_number(value);
    if v.whole_number && !(number.is_finite() && number.fract() == 0.0) {
        error = Some(format!("{} must be a whole number", label));
    }
    if let Some(max) = v.number_to_inclusive {
        if number > max {
            error = Some(format!("{} must be less than or equal to {}", label, max));
        }
    }
    if let Some(min) = v.number_from_inclusive {
        if number < min {
            error = Some(format!("{} must be greater than or equal to {}", label, min));
        }
    }

    let text = coerce::to_text(value);
    if let Some(pattern) = &v.regex_match {
        if !pattern.is_match(&text) {
            error = Some(format!("{} is in an invalid format", label));
        }
    }
    if let Some(patterns) = &v.regex_match_all {
        if !patterns.iter().all(|p| p.is_match(&text)) {
            error = Some(format!("{} does not match all required patterns", label));
        }
    }

    if let Some(prefix) = &v.starts_with {
        if !value.and_then(Value::as_str).is_some_and(|s| s.starts_with(prefix.as_str())) {
            error = Some(format!("{} must start with \"{}\"", label, prefix));
        }
    }
    if let Some(suffix) = &v.ends_with {
        if !value.and_then(Value::as_str).is_some_and(|s| s.ends_with(suffix.as_str())) {
            error = Some(format!("{} must end with \"{}\"", label, suffix));
        }
    }
    if let Some(needle) = &v.contains {
        let found = match (value, needle) {
            (Some(Value::String(s)), Value::String(n)) => s.contains(n.as_str()),
            (Some(Value::Array(items)), n) => items.contains(n),
            _ => false,
        };
        if !found {
            error = Some(format!("{} must contain \"{}\"", label, coerce::to_text(Some(needle))));
        }
    }

    if let Some(keys) = &v.object_has_keys {
        let missing: Vec<&str> = match value {
            Some(Value::Object(map)) => keys
                .iter()
                .filter(|k| !map.contains_key(k.as_str()))
                .map(String::as_str)
                .collect(),
            _ => keys.iter().map(String::as_str).collect(),
        };
        if !missing.is_empty() {
            error = Some(format!("{} is missing required keys: {}", label, missing.join(", ")));
        }
    }
    if let Some(keys) = &v.object_has_either_keys {
        let any = match value {
            Some(Value::Object(map)) => keys.iter().any(|k| map.contains_key(k.as_str())),
            _ => false,
        };
        if !any {
            error = Some(format!("{} must contain at least one of: {}", label, keys.join(", ")));
        }
    }

    error
}
