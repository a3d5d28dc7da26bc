//! Declarative validation rules.
//!
//! Rules deserialize from the same camelCase shape controllers declare them
//! in:
//!
//! ```yaml
//! - field: email
//!   validation:
//!     notEmpty: true
//!     regexMatch: "^[^@\\s]+@[^@\\s]+$"
//!     customError: Enter a valid email address
//! - field: retriever_config.k
//!   validation:
//!     wholeNumber: true
//!     numberFromInclusive: 1
//!   validateIf:
//!     field: retriever_type
//!     condition: { op: equals, value: similarity }
//! ```

use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::coerce;
use super::error::RuleError;

/// A compiled regular expression that (de)serializes as its source string.
#[derive(Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(source: &str) -> Result<Self, RuleError> {
        Regex::new(source)
            .map(Self)
            .map_err(|e| RuleError::InvalidPattern {
                pattern: source.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({:?})", self.0.as_str())
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Pattern::new(&source).map_err(de::Error::custom)
    }
}

/// Type names accepted by `ofType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Number,
    Boolean,
    Object,
    Undefined,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::String => "string",
            ValueType::Number => "number",
            ValueType::Boolean => "boolean",
            ValueType::Object => "object",
            ValueType::Undefined => "undefined",
        };
        f.write_str(name)
    }
}

/// Which part of the object a rule looks at.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldSelector {
    /// Dot path, literal key (with `disallowDotSplit`), or `""` for the
    /// whole object.
    Name(String),
    /// Every top-level key matching the expression, validated literally.
    /// Used for flattened array entries such as `streams[3].name`.
    Matching { pattern: Pattern },
}

impl From<&str> for FieldSelector {
    fn from(name: &str) -> Self {
        FieldSelector::Name(name.to_string())
    }
}

/// Predicate set applied to one field. Evaluation order is fixed by the
/// engine, not by the order fields are declared here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Validation {
    #[serde(skip_serializing_if = "is_false")]
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub of_type: Option<ValueType>,
    #[serde(skip_serializing_if = "is_false")]
    pub not_empty: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length_min: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length_max: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_length: Option<usize>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_set: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "is_false")]
    pub whole_number: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_to_inclusive: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_from_inclusive: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex_match: Option<Pattern>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex_match_all: Option<Vec<Pattern>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_with: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_with: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contains: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_has_keys: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_has_either_keys: Option<Vec<String>>,
    /// Apply every other predicate to each element of an array value.
    #[serde(skip_serializing_if = "is_false")]
    pub as_array: bool,
    /// Treat the field name as one literal key even if it contains dots.
    #[serde(skip_serializing_if = "is_false")]
    pub disallow_dot_split: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_error: Option<String>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Guard predicate for `validateIf`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "camelCase")]
pub enum Condition {
    Truthy,
    Falsy,
    Equals(Value),
    NotEquals(Value),
    In(Vec<Value>),
    /// In-process predicate; cannot be declared in configuration.
    #[serde(skip)]
    Custom(Arc<dyn Fn(Option<&Value>) -> bool + Send + Sync>),
}

impl Condition {
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(Option<&Value>) -> bool + Send + Sync + 'static,
    {
        Condition::Custom(Arc::new(predicate))
    }

    pub fn holds(&self, value: Option<&Value>) -> bool {
        match self {
            Condition::Truthy => coerce::is_truthy(value),
            Condition::Falsy => !coerce::is_truthy(value),
            Condition::Equals(expected) => value == Some(expected),
            Condition::NotEquals(expected) => value != Some(expected),
            Condition::In(options) => value.is_some_and(|v| options.contains(v)),
            Condition::Custom(predicate) => predicate(value),
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Truthy => f.write_str("Truthy"),
            Condition::Falsy => f.write_str("Falsy"),
            Condition::Equals(v) => f.debug_tuple("Equals").field(v).finish(),
            Condition::NotEquals(v) => f.debug_tuple("NotEquals").field(v).finish(),
            Condition::In(v) => f.debug_tuple("In").field(v).finish(),
            Condition::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateIf {
    pub field: String,
    pub condition: Condition,
}

/// One link of a validation chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    pub field: FieldSelector,
    #[serde(default)]
    pub validation: Validation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate_if: Option<ValidateIf>,
}

impl ValidationRule {
    pub fn new(field: impl Into<String>, validation: Validation) -> Self {
        Self {
            field: FieldSelector::Name(field.into()),
            validation,
            validate_if: None,
        }
    }

    /// Rule applied to every top-level key matching `pattern`.
    pub fn matching(pattern: &str, validation: Validation) -> Result<Self, RuleError> {
        Ok(Self {
            field: FieldSelector::Matching {
                pattern: Pattern::new(pattern)?,
            },
            validation,
            validate_if: None,
        })
    }

    pub fn validate_if(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.validate_if = Some(ValidateIf {
            field: field.into(),
            condition,
        });
        self
    }
}
