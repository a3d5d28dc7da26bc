//! Validation-chain engine
//!
//! Evaluates ordered, declarative per-field rules against plain JSON
//! objects. Controllers run a chain before persisting a payload and turn
//! the returned message into a `400` response.

pub mod coerce;
pub mod engine;
pub mod error;
pub mod rule;
pub mod ruleset;

pub use engine::{chain_validations, FieldLabels, EMPTY_INPUT_MESSAGE};
pub use error::RuleError;
pub use rule::{Condition, FieldSelector, Pattern, ValidateIf, Validation, ValidationRule, ValueType};
pub use ruleset::RuleSet;
