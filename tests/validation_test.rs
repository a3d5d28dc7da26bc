use agentcloud::validation::{
    chain_validations, Condition, FieldLabels, Pattern, RuleSet, Validation, ValidationRule, ValueType,
};
use serde_json::json;

fn labels() -> FieldLabels {
    FieldLabels::from([
        ("email".to_string(), "Email".to_string()),
        ("password".to_string(), "Password".to_string()),
        ("numbers".to_string(), "Numbers".to_string()),
        ("name".to_string(), "Name".to_string()),
    ])
}

fn email_rule() -> ValidationRule {
    ValidationRule::new(
        "email",
        Validation {
            not_empty: true,
            regex_match: Some(Pattern::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap()),
            ..Default::default()
        },
    )
}

fn password_rule() -> ValidationRule {
    ValidationRule::new(
        "password",
        Validation {
            not_empty: true,
            length_min: Some(8),
            ..Default::default()
        },
    )
}

#[test]
fn test_valid_credentials_pass() {
    let object = json!({ "email": "test@example.com", "password": "password123" });
    let result = chain_validations(&object, &[email_rule(), password_rule()], Some(&labels()));
    assert_eq!(result, None);
}

#[test]
fn test_empty_email_reports_format_error() {
    // regexMatch is checked after notEmpty, so its message wins
    let result = chain_validations(&json!({ "email": "" }), &[email_rule()], Some(&labels()));
    assert_eq!(result.as_deref(), Some("Email is in an invalid format"));
}

#[test]
fn test_missing_field_is_empty() {
    let rule = ValidationRule::new("name", Validation { not_empty: true, ..Default::default() });
    let result = chain_validations(&json!({}), &[rule], Some(&labels()));
    assert_eq!(result.as_deref(), Some("Name is empty"));
}

#[test]
fn test_as_array_type_check() {
    let rule = ValidationRule::new(
        "numbers",
        Validation {
            as_array: true,
            of_type: Some(ValueType::Number),
            ..Default::default()
        },
    );
    let result = chain_validations(&json!({ "numbers": [1, "two", 3] }), &[rule.clone()], Some(&labels()));
    assert_eq!(result.as_deref(), Some("Numbers is an invalid type, should be \"number\""));

    assert_eq!(chain_validations(&json!({ "numbers": [1, 2, 3] }), &[rule], Some(&labels())), None);
}

#[test]
fn test_short_password_after_valid_email() {
    let object = json!({ "email": "test@example.com", "password": "short" });
    let result = chain_validations(&object, &[email_rule(), password_rule()], Some(&labels()));
    assert_eq!(result.as_deref(), Some("Password must have a length of at least 8"));
}

#[test]
fn test_zero_and_false_are_not_empty() {
    let rules = vec![
        ValidationRule::new("count", Validation { not_empty: true, ..Default::default() }),
        ValidationRule::new("enabled", Validation { not_empty: true, ..Default::default() }),
    ];
    assert_eq!(chain_validations(&json!({ "count": 0, "enabled": false }), &rules, None), None);
}

#[test]
fn test_nested_path_and_validate_if() {
    let rules = vec![
        ValidationRule::new(
            "retriever_config.k",
            Validation {
                whole_number: true,
                number_from_inclusive: Some(1.0),
                ..Default::default()
            },
        )
        .validate_if("retriever_type", Condition::Equals(json!("similarity"))),
    ];

    let skipped = json!({ "retriever_type": "raw", "retriever_config": { "k": 0 } });
    assert_eq!(chain_validations(&skipped, &rules, None), None);

    let checked = json!({ "retriever_type": "similarity", "retriever_config": { "k": 0 } });
    assert_eq!(
        chain_validations(&checked, &rules, None).as_deref(),
        Some("[retriever_config.k] must be greater than or equal to 1")
    );
}

#[test]
fn test_ruleset_from_json_config() {
    let ruleset: RuleSet = serde_json::from_value(json!({
        "name": "login",
        "labels": { "email": "Email" },
        "rules": [
            { "field": "email", "validation": { "notEmpty": true, "customError": "Email is required" } },
            { "field": "role", "validation": { "inSet": ["admin", "member"] } }
        ]
    }))
    .unwrap_or_else(|e| panic!("rule set should parse: {}", e));

    assert!(ruleset.check().is_empty());
    assert_eq!(ruleset.validate(&json!({})).as_deref(), Some("Email is required"));
    assert_eq!(
        ruleset.validate(&json!({ "email": "a@b.co", "role": "owner" })).as_deref(),
        Some("[role] is not an allowed value")
    );
    assert_eq!(ruleset.validate(&json!({ "email": "a@b.co", "role": "admin" })), None);
}
