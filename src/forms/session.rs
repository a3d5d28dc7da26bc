//! Form session: a registry plus interaction state, driven by user
//! operations and re-rendered after each one.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use super::controls::Control;
use super::dates::DisplayFormat;
use super::error::FormError;
use super::registry::{build_submission, FieldRegistry, FormState};
use super::renderer::{clamp_count, render, ArrayBounds, Layout, Leaf, UiState};
use super::resolver::{resolve_properties, SchemaResolutionContext};
use super::schema::SchemaNode;
use crate::domain::path::PropertyPath;
use crate::validation::coerce::MAX_EXACT_INTEGER;
use crate::validation::RuleSet;

pub struct FormSession<R: FieldRegistry = FormState> {
    schema: SchemaNode,
    registry: R,
    ui: UiState,
    display: DisplayFormat,
    layout: Layout,
}

/// Resolve a JSON schema whose root carries `properties` and an optional
/// `required` list into the root node the renderer walks.
pub fn root_from_json_schema(schema: &Value, max_depth: usize) -> Result<SchemaNode, FormError> {
    let properties = schema
        .get("properties")
        .and_then(|v| v.as_object())
        .filter(|props| !props.is_empty())
        .ok_or(FormError::NoProperties)?;
    let required: Vec<String> = schema
        .get("required")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default();

    let mut ctx = SchemaResolutionContext::from_schema(schema).with_max_depth(max_depth);
    Ok(resolve_properties(properties, &required, &mut ctx))
}

impl FormSession<FormState> {
    pub fn from_json_schema(schema: &Value, display: DisplayFormat, max_depth: usize) -> Result<Self, FormError> {
        let root = root_from_json_schema(schema, max_depth)?;
        Ok(Self::new(root, FormState::new(), display))
    }
}

/// A user operation on a session, as sent by a client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FormAction {
    Set { path: PropertyPath, value: Value },
    SelectVariant { path: PropertyPath, index: usize },
    AddItem { path: PropertyPath },
    RemoveItem { path: PropertyPath, index: usize },
}

impl<R: FieldRegistry> FormSession<R> {
    pub fn new(schema: SchemaNode, registry: R, display: DisplayFormat) -> Self {
        Self::restore(schema, registry, display, UiState::default(), None)
    }

    /// Open a session for editing existing values. Variant selections and
    /// array lengths are inferred from `values`.
    pub fn with_values(schema: SchemaNode, registry: R, display: DisplayFormat, values: &Value) -> Self {
        Self::restore(schema, registry, display, UiState::default(), Some(values))
    }

    /// Open a session with explicit interaction state; `values` only seed
    /// fields the registry does not hold yet.
    pub fn restore(
        schema: SchemaNode,
        mut registry: R,
        display: DisplayFormat,
        mut ui: UiState,
        values: Option<&Value>,
    ) -> Self {
        let layout = render(&schema, &mut registry, &mut ui, &display, values);
        Self {
            schema,
            registry,
            ui,
            display,
            layout,
        }
    }

    pub fn controls(&self) -> &[Control] {
        &self.layout.controls
    }

    pub fn ui_state(&self) -> &UiState {
        &self.ui
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn schema(&self) -> &SchemaNode {
        &self.schema
    }

    /// Paths of every mounted leaf.
    pub fn fields(&self) -> impl Iterator<Item = &PropertyPath> {
        self.layout.leaves.keys()
    }

    pub fn value(&self, path: &PropertyPath) -> Option<&Value> {
        self.registry.value(path)
    }

    pub fn apply(&mut self, action: &FormAction) -> Result<(), FormError> {
        match action {
            FormAction::Set { path, value } => self.set_input(path, value.clone()),
            FormAction::SelectVariant { path, index } => self.select_variant(path, *index),
            FormAction::AddItem { path } => self.add_item(path).map(|_| ()),
            FormAction::RemoveItem { path, index } => self.remove_item(path, *index),
        }
    }

    /// Apply raw user input to a mounted leaf.
    pub fn set_input(&mut self, path: &PropertyPath, raw: Value) -> Result<(), FormError> {
        let leaf = self
            .layout
            .leaves
            .get(path)
            .ok_or_else(|| FormError::UnknownField(path.clone()))?;
        let value = coerce_input(leaf, raw, &self.display).map_err(|reason| FormError::InvalidInput {
            path: path.clone(),
            reason,
        })?;
        debug!(path = %path, value = %value, "Field updated");
        self.registry.set_value(path, value);
        self.refresh();
        Ok(())
    }

    /// Switch a `oneOf` field to another branch, discarding every value
    /// entered under it.
    pub fn select_variant(&mut self, path: &PropertyPath, index: usize) -> Result<(), FormError> {
        let count = match self.layout.variants.get(path) {
            Some(count) => *count,
            None => return Err(self.not_found(path, "a oneOf field")),
        };
        if index >= count {
            return Err(FormError::InvalidVariant {
                path: path.clone(),
                index,
                count,
            });
        }
        if self.ui.variants.get(path) == Some(&index) {
            return Ok(());
        }

        for (field, _) in self.registry.values() {
            if field.starts_with(path) {
                self.registry.unregister(&field);
            }
        }
        self.ui.variants.retain(|p, _| !p.starts_with(path));
        self.ui.array_lengths.retain(|p, _| !p.starts_with(path));
        self.ui.variants.insert(path.clone(), index);

        debug!(path = %path, variant = index, "Variant selected");
        self.refresh();
        Ok(())
    }

    /// Append an entry to an array field; returns its index.
    pub fn add_item(&mut self, path: &PropertyPath) -> Result<usize, FormError> {
        let (bounds, count) = self.array_state(path)?;
        let max = clamp_count(usize::MAX, bounds.min_items, bounds.max_items);
        if count >= max {
            return Err(FormError::TooManyItems {
                path: path.clone(),
                max: max as u64,
            });
        }

        self.ui.array_lengths.insert(path.clone(), count + 1);
        debug!(path = %path, index = count, "Array item added");
        self.refresh();
        Ok(count)
    }

    /// Remove entry `index` from an array field. Later entries move down by
    /// one, keeping their values.
    pub fn remove_item(&mut self, path: &PropertyPath, index: usize) -> Result<(), FormError> {
        let (bounds, count) = self.array_state(path)?;
        if index >= count {
            return Err(FormError::NoSuchItem { path: path.clone(), index });
        }
        if let Some(min) = bounds.min_items {
            if count as u64 <= min {
                return Err(FormError::TooFewItems { path: path.clone(), min });
            }
        }

        let pos = path.depth();
        let removed = path.push_index(index);
        let mut entries = self.registry.values();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        for (field, _) in &entries {
            if field.starts_with(&removed) {
                self.registry.unregister(field);
            }
        }
        for (field, value) in entries {
            if !field.starts_with(path) {
                continue;
            }
            if let Some(i) = field.index_at(pos).filter(|i| *i > index) {
                self.registry.unregister(&field);
                self.registry.register(&field.with_index_at(pos, i - 1), value);
            }
        }
        shift_keys(&mut self.ui.variants, path, index);
        shift_keys(&mut self.ui.array_lengths, path, index);
        self.ui.array_lengths.insert(path.clone(), count - 1);

        debug!(path = %path, index, "Array item removed");
        self.refresh();
        Ok(())
    }

    /// The submitted object: every registered, non-null value nested by
    /// its path.
    pub fn submission(&self) -> Value {
        build_submission(&self.registry.values())
    }

    /// Submission checked against an optional rule set.
    pub fn submit(&self, ruleset: Option<&RuleSet>) -> Result<Value, FormError> {
        let submission = self.submission();
        if let Some(message) = ruleset.and_then(|rules| rules.validate(&submission)) {
            return Err(FormError::Rejected(message));
        }
        Ok(submission)
    }

    /// Re-render and unregister leaves that are no longer reached.
    fn refresh(&mut self) {
        let layout = render(&self.schema, &mut self.registry, &mut self.ui, &self.display, None);
        for path in self.layout.leaves.keys() {
            if !layout.leaves.contains_key(path) {
                debug!(path = %path, "Unregistering field");
                self.registry.unregister(path);
            }
        }
        self.ui.variants.retain(|p, _| layout.variants.contains_key(p));
        self.ui.array_lengths.retain(|p, _| layout.arrays.contains_key(p));
        self.layout = layout;
    }

    fn array_state(&self, path: &PropertyPath) -> Result<(ArrayBounds, usize), FormError> {
        match self.layout.arrays.get(path) {
            Some(bounds) => Ok((*bounds, self.ui.array_lengths.get(path).copied().unwrap_or(0))),
            None => Err(self.not_found(path, "a repeatable list")),
        }
    }

    fn not_found(&self, path: &PropertyPath, expected: &'static str) -> FormError {
        if self.schema.find(path).is_some() {
            FormError::WrongFieldKind {
                path: path.clone(),
                expected,
            }
        } else {
            FormError::UnknownField(path.clone())
        }
    }
}

/// Drop keys under entry `index` of `array` and move later entries down.
fn shift_keys<V>(map: &mut BTreeMap<PropertyPath, V>, array: &PropertyPath, index: usize) {
    let pos = array.depth();
    let keys: Vec<PropertyPath> = map
        .keys()
        .filter(|k| k.depth() > pos && k.starts_with(array))
        .cloned()
        .collect();
    for key in keys {
        match key.index_at(pos) {
            Some(i) if i == index => {
                map.remove(&key);
            }
            Some(i) if i > index => {
                if let Some(v) = map.remove(&key) {
                    map.insert(key.with_index_at(pos, i - 1), v);
                }
            }
            _ => {}
        }
    }
}

fn coerce_input(leaf: &Leaf, raw: Value, display: &DisplayFormat) -> Result<Value, String> {
    let blank = matches!(&raw, Value::Null) || matches!(&raw, Value::String(s) if s.trim().is_empty());

    match leaf {
        Leaf::Text => Ok(match raw {
            Value::String(s) if s.is_empty() => Value::Null,
            Value::String(s) => Value::String(s),
            Value::Null => Value::Null,
            other => Value::String(other.to_string()),
        }),
        _ if blank && !matches!(leaf, Leaf::Boolean | Leaf::Constant(_)) => Ok(Value::Null),
        Leaf::Integer => match &raw {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(raw),
            Value::Number(n) => match n.as_f64() {
                Some(f) if f.fract() != 0.0 => Err(format!("{n} is not a whole number")),
                Some(f) if f.abs() < MAX_EXACT_INTEGER => Ok(Value::from(f as i64)),
                _ => Err(format!("{n} is out of range for an integer")),
            },
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("'{s}' is not an integer")),
            other => Err(format!("expected an integer, got {other}")),
        },
        Leaf::Number => match &raw {
            Value::Number(_) => Ok(raw),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("'{s}' is not a number")),
            other => Err(format!("expected a number, got {other}")),
        },
        Leaf::Boolean => match &raw {
            Value::Bool(_) => Ok(raw),
            Value::Null => Ok(Value::Bool(false)),
            Value::String(s) => match s.trim() {
                "true" => Ok(Value::Bool(true)),
                "false" | "" => Ok(Value::Bool(false)),
                _ => Err(format!("'{s}' is not true or false")),
            },
            other => Err(format!("expected a boolean, got {other}")),
        },
        Leaf::Choice { options, multiple } => {
            let pick = |candidate: &Value| {
                options
                    .iter()
                    .find(|option| {
                        *option == candidate
                            || candidate.as_str().is_some_and(|s| option_text(option) == s)
                    })
                    .cloned()
                    .ok_or_else(|| format!("{candidate} is not one of the allowed options"))
            };
            if *multiple {
                let candidates = match &raw {
                    Value::Array(items) => items.clone(),
                    other => vec![other.clone()],
                };
                candidates
                    .iter()
                    .map(pick)
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            } else {
                pick(&raw)
            }
        }
        Leaf::Constant(constant) => {
            if raw.is_null() || raw == *constant {
                Ok(constant.clone())
            } else {
                Err(format!("only {constant} is allowed"))
            }
        }
        Leaf::Date(pattern) => match &raw {
            Value::String(s) => pattern
                .normalize(s, display)
                .map(Value::String)
                .ok_or_else(|| format!("'{s}' is not a recognised date")),
            other => Err(format!("expected a date string, got {other}")),
        },
    }
}

fn option_text(option: &Value) -> String {
    match option {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn connector_schema() -> Value {
        json!({
            "type": "object",
            "required": ["host", "port"],
            "properties": {
                "host": { "type": "string", "order": 0 },
                "port": { "type": "integer", "default": 5432, "order": 1 },
                "ssl": { "type": "boolean", "order": 2 },
                "region": { "type": "string", "enum": ["eu", "us"], "order": 3 },
                "tunnel": {
                    "type": "object",
                    "order": 4,
                    "oneOf": [
                        {
                            "title": "Password",
                            "properties": {
                                "method": { "const": "SSH_PASSWORD_AUTH" },
                                "tunnel_user": { "type": "string" },
                                "tunnel_password": { "type": "string", "airbyte_secret": true }
                            }
                        },
                        {
                            "title": "Key",
                            "properties": {
                                "method": { "const": "SSH_KEY_AUTH" },
                                "tunnel_user": { "type": "string" },
                                "ssh_key": { "type": "string" }
                            }
                        }
                    ]
                },
                "hosts": { "type": "array", "items": { "type": "string" }, "maxItems": 3, "order": 5 },
                "start_date": { "type": "string", "format": "date", "order": 6 }
            }
        })
    }

    fn session() -> FormSession {
        FormSession::from_json_schema(&connector_schema(), DisplayFormat::default(), 20).unwrap()
    }

    fn path(s: &str) -> PropertyPath {
        PropertyPath::parse(s)
    }

    #[test]
    fn test_set_input_coerces_values() {
        let mut form = session();
        form.set_input(&path("host"), json!("db.internal")).unwrap();
        form.set_input(&path("port"), json!("6543")).unwrap();
        form.set_input(&path("ssl"), json!("true")).unwrap();
        form.set_input(&path("region"), json!("us")).unwrap();
        form.set_input(&path("start_date"), json!("15/01/2024")).unwrap();

        let submission = form.submission();
        assert_eq!(submission["host"], json!("db.internal"));
        assert_eq!(submission["port"], json!(6543));
        assert_eq!(submission["ssl"], json!(true));
        assert_eq!(submission["region"], json!("us"));
        assert_eq!(submission["start_date"], json!("2024-01-15"));
        assert_eq!(submission["tunnel"]["method"], json!("SSH_PASSWORD_AUTH"));
    }

    #[test]
    fn test_set_input_rejects_bad_values() {
        let mut form = session();
        assert!(matches!(
            form.set_input(&path("port"), json!("abc")),
            Err(FormError::InvalidInput { .. })
        ));
        assert!(matches!(
            form.set_input(&path("region"), json!("apac")),
            Err(FormError::InvalidInput { .. })
        ));
        assert!(matches!(
            form.set_input(&path("port"), json!(1e30)),
            Err(FormError::InvalidInput { ref reason, .. }) if reason.contains("out of range")
        ));
        assert!(matches!(
            form.set_input(&path("port"), json!(80.5)),
            Err(FormError::InvalidInput { .. })
        ));
        form.set_input(&path("port"), json!(6543.0)).unwrap();
        assert_eq!(form.value(&path("port")), Some(&json!(6543)));
        assert!(matches!(
            form.set_input(&path("nope"), json!("x")),
            Err(FormError::UnknownField(_))
        ));
        assert!(matches!(
            form.set_input(&path("tunnel.ssh_key"), json!("x")),
            Err(FormError::UnknownField(_))
        ));
    }

    #[test]
    fn test_variant_switch_discards_previous_branch() {
        let mut form = session();
        form.set_input(&path("tunnel.tunnel_user"), json!("alice")).unwrap();
        form.set_input(&path("tunnel.tunnel_password"), json!("hunter2")).unwrap();

        form.select_variant(&path("tunnel"), 1).unwrap();
        assert!(!form.registry().is_registered(&path("tunnel.tunnel_password")));

        let submission = form.submission();
        assert_eq!(submission["tunnel"], json!({ "method": "SSH_KEY_AUTH" }));
        assert!(form.fields().any(|p| p == &path("tunnel.ssh_key")));
    }

    #[test]
    fn test_variant_bounds() {
        let mut form = session();
        assert!(matches!(
            form.select_variant(&path("tunnel"), 5),
            Err(FormError::InvalidVariant { count: 2, .. })
        ));
        assert!(matches!(
            form.select_variant(&path("host"), 0),
            Err(FormError::WrongFieldKind { .. })
        ));
    }

    #[test]
    fn test_add_and_remove_items_shift_values() {
        let mut form = session();
        for name in ["a", "b", "c"] {
            let idx = form.add_item(&path("hosts")).unwrap();
            form.set_input(&path("hosts").push_index(idx), json!(name)).unwrap();
        }
        assert!(matches!(
            form.add_item(&path("hosts")),
            Err(FormError::TooManyItems { max: 3, .. })
        ));

        form.remove_item(&path("hosts"), 0).unwrap();
        assert_eq!(form.submission()["hosts"], json!(["b", "c"]));
        assert!(!form.registry().is_registered(&path("hosts[2]")));
        assert_eq!(form.ui_state().array_lengths.get(&path("hosts")), Some(&2));

        assert!(matches!(
            form.remove_item(&path("hosts"), 4),
            Err(FormError::NoSuchItem { .. })
        ));
    }

    #[test]
    fn test_remove_respects_min_items() {
        let schema = json!({
            "type": "object",
            "properties": {
                "streams": {
                    "type": "array",
                    "minItems": 1,
                    "items": { "type": "object", "properties": { "name": { "type": "string" } } }
                }
            }
        });
        let mut form = FormSession::from_json_schema(&schema, DisplayFormat::default(), 20).unwrap();
        assert!(matches!(
            form.remove_item(&path("streams"), 0),
            Err(FormError::TooFewItems { min: 1, .. })
        ));
    }

    #[test]
    fn test_with_values_seeds_fields() {
        let schema = connector_schema();
        let mut ctx = SchemaResolutionContext::from_schema(&schema);
        let properties = schema["properties"].as_object().unwrap();
        let root = resolve_properties(properties, &[], &mut ctx);

        let existing = json!({
            "host": "db",
            "tunnel": { "method": "SSH_KEY_AUTH", "tunnel_user": "bob", "ssh_key": "KEY" },
            "hosts": ["x", "y"]
        });
        let form = FormSession::with_values(root, FormState::new(), DisplayFormat::default(), &existing);

        assert_eq!(form.ui_state().variants.get(&path("tunnel")), Some(&1));
        let submission = form.submission();
        assert_eq!(submission["tunnel"]["ssh_key"], json!("KEY"));
        assert_eq!(submission["hosts"], json!(["x", "y"]));
        assert_eq!(submission["port"], json!(5432));
    }

    #[test]
    fn test_submit_with_ruleset() {
        let ruleset: RuleSet = serde_json::from_value(json!({
            "name": "postgres",
            "labels": { "host": "Host" },
            "rules": [{ "field": "host", "validation": { "notEmpty": true } }]
        }))
        .unwrap();

        let mut form = session();
        assert!(matches!(
            form.submit(Some(&ruleset)),
            Err(FormError::Rejected(msg)) if msg == "Host is empty"
        ));
        form.set_input(&path("host"), json!("db")).unwrap();
        assert!(form.submit(Some(&ruleset)).is_ok());
    }

    #[test]
    fn test_actions_from_json() {
        let actions: Vec<FormAction> = serde_json::from_value(json!([
            { "op": "set", "path": "host", "value": "db" },
            { "op": "select_variant", "path": "tunnel", "index": 1 },
            { "op": "set", "path": "tunnel.ssh_key", "value": "KEY" },
            { "op": "add_item", "path": "hosts" },
            { "op": "set", "path": "hosts[0]", "value": "replica" }
        ]))
        .unwrap();

        let mut form = session();
        for action in &actions {
            form.apply(action).unwrap();
        }
        let submission = form.submission();
        assert_eq!(submission["tunnel"]["ssh_key"], json!("KEY"));
        assert_eq!(submission["hosts"], json!(["replica"]));
    }

    #[test]
    fn test_schema_without_properties() {
        assert!(matches!(
            FormSession::from_json_schema(&json!({ "type": "object" }), DisplayFormat::default(), 20),
            Err(FormError::NoProperties)
        ));
    }
}
