use std::collections::HashMap;
use thiserror::Error;

use crate::config::{FormSettings, RateLimitConfig, ServerSettings, Settings};
use crate::validation::{RuleError, RuleSet};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("Invalid rule set: {0}")]
    RuleSet(#[from] RuleError),
}

/// Collects every problem in a loaded configuration.
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        errors.extend(Self::validate_server(&settings.server));
        if let Some(rate_limit) = &settings.rate_limit {
            errors.extend(Self::validate_rate_limit(rate_limit));
        }
        errors.extend(Self::validate_forms(&settings.forms));
        errors.extend(Self::validate_rulesets(&settings.rulesets));

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_server(server: &ServerSettings) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if server.host.is_empty() {
            errors.push(ValidationError::MissingField("server.host".to_string()));
        }

        if server.port == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "server.port".to_string(),
                reason: "Port must be greater than 0".to_string(),
            });
        }

        errors
    }

    fn validate_rate_limit(rate_limit: &RateLimitConfig) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if rate_limit.enabled && rate_limit.requests_per_second == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "rate_limit.requests_per_second".to_string(),
                reason: "Must be greater than 0 when rate limiting is enabled".to_string(),
            });
        }
        errors
    }

    fn validate_forms(forms: &FormSettings) -> Vec<ValidationError> {
        let mut errors: Vec<ValidationError> = forms
            .display_format()
            .invalid_fields()
            .into_iter()
            .map(|field| ValidationError::InvalidValue {
                field: format!("forms.{}_display_format", field),
                reason: "Not a strftime format that can render a local date".to_string(),
            })
            .collect();

        if forms.max_schema_depth == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "forms.max_schema_depth".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }
        errors
    }

    fn validate_rulesets(rulesets: &[RuleSet]) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut seen_names = HashMap::new();

        for (idx, ruleset) in rulesets.iter().enumerate() {
            if let Some(prev_idx) = seen_names.insert(&ruleset.name, idx) {
                errors.push(ValidationError::Duplicate(format!(
                    "Rule set name '{}' appears at indices {} and {}",
                    ruleset.name, prev_idx, idx
                )));
            }

            if ruleset.name.is_empty() {
                errors.push(ValidationError::MissingField(format!("rulesets[{}].name", idx)));
            }

            errors.extend(ruleset.check().into_iter().map(ValidationError::from));
        }

        errors
    }
}
