use thiserror::Error;

/// Errors raised while building rules. Evaluating a chain never errors.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Rule set '{0}' has no rules")]
    EmptyRuleSet(String),

    #[error("Rule {index} in rule set '{ruleset}' uses a custom condition, which cannot be declared in configuration")]
    UndeclarableCondition { ruleset: String, index: usize },
}
