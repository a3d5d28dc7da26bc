//! Named rule chains declared in configuration.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::engine::{chain_validations, FieldLabels};
use super::error::RuleError;
use super::rule::{Condition, ValidationRule};

/// A named validation chain with its field labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    /// Unique name, used in `/api/rulesets/:name/validate`
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub labels: FieldLabels,
    pub rules: Vec<ValidationRule>,
}

impl RuleSet {
    pub fn validate(&self, object: &Value) -> Option<String> {
        chain_validations(object, &self.rules, Some(&self.labels))
    }

    /// Problems that make this rule set unusable from configuration.
    pub fn check(&self) -> Vec<RuleError> {
        let mut errors = Vec::new();
        if self.rules.is_empty() {
            errors.push(RuleError::EmptyRuleSet(self.name.clone()));
        }
        for (index, rule) in self.rules.iter().enumerate() {
            if let Some(guard) = &rule.validate_if {
                if matches!(guard.condition, Condition::Custom(_)) {
                    errors.push(RuleError::UndeclarableCondition {
                        ruleset: self.name.clone(),
                        index,
                    });
                }
            }
        }
        errors
    }
}
