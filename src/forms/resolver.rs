//! JSON Schema resolution with $ref support
//!
//! Resolves connector configuration schemas into a `SchemaNode` tree,
//! handling `$ref` references, `oneOf` alternatives and nested structures.
//! Nodes the renderer cannot show are logged and left out.

use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use tracing::{error, warn};

use super::dates::DatePattern;
use super::schema::{sort_by_order, SchemaNode, SchemaNodeType};

pub const DEFAULT_MAX_DEPTH: usize = 20;

/// Context for schema resolution, carrying available definitions
pub struct SchemaResolutionContext {
    /// Local definitions from the root schema (#/$defs/* or #/definitions/*)
    pub definitions: HashMap<String, Value>,
    /// Track visited refs to detect cycles
    visited_refs: HashSet<String>,
    pub max_depth: usize,
}

impl Default for SchemaResolutionContext {
    fn default() -> Self {
        Self {
            definitions: HashMap::new(),
            visited_refs: HashSet::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl SchemaResolutionContext {
    /// Create a new context with definitions extracted from a schema
    pub fn from_schema(schema: &Value) -> Self {
        let mut ctx = Self::default();
        for key in ["definitions", "$defs"] {
            if let Some(defs) = schema.get(key).and_then(|v| v.as_object()) {
                for (name, def) in defs {
                    ctx.definitions.insert(name.clone(), def.clone());
                }
            }
        }
        ctx
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    fn enter_ref(&mut self, ref_path: &str) -> bool {
        self.visited_refs.insert(ref_path.to_string())
    }

    fn exit_ref(&mut self, ref_path: &str) {
        self.visited_refs.remove(ref_path);
    }
}

/// Resolve a JSON Schema value into a `SchemaNode`.
///
/// Returns `None` for nodes that cannot be rendered: a missing `type`
/// (warned), an unsupported `type` (error), or an unresolvable `$ref`.
pub fn resolve_schema(schema: &Value, ctx: &mut SchemaResolutionContext, depth: usize) -> Option<SchemaNode> {
    if depth > ctx.max_depth {
        warn!(depth, max_depth = ctx.max_depth, "Schema nesting too deep, skipping node");
        return None;
    }

    if let Some(ref_value) = schema.get("$ref").and_then(|v| v.as_str()) {
        return resolve_ref(ref_value, schema, ctx, depth);
    }

    let mut node = extract_common_props(schema);

    if let Some(one_of) = schema.get("oneOf").and_then(|v| v.as_array()) {
        let variants: Vec<SchemaNode> = one_of
            .iter()
            .filter_map(|v| resolve_schema(v, ctx, depth + 1))
            .collect();
        if variants.is_empty() {
            warn!(title = ?node.title, "oneOf has no renderable variants, skipping node");
            return None;
        }
        let labels = generate_variant_labels(&variants);
        node.kind = SchemaNodeType::OneOf { variants, labels };
        return Some(node);
    }

    if let Some(const_val) = schema.get("const") {
        node.kind = SchemaNodeType::Constant(const_val.clone());
        return Some(node);
    }

    if let Some(enum_values) = schema.get("enum").and_then(|v| v.as_array()) {
        node.kind = SchemaNodeType::Choice {
            options: enum_values.clone(),
        };
        return Some(node);
    }

    let type_str = match declared_type(schema) {
        Some(t) => t,
        // Variant objects in connector specs often omit "type"
        None if schema.get("properties").is_some() => "object",
        None => {
            warn!(title = ?node.title, "Schema node has no type, skipping");
            return None;
        }
    };

    node.kind = match type_str {
        "boolean" => SchemaNodeType::Boolean,
        "integer" => SchemaNodeType::Integer,
        "number" => SchemaNodeType::Number,
        "string" => {
            let format = schema.get("format").and_then(|v| v.as_str());
            match DatePattern::infer(format, node.pattern.as_deref()) {
                Some(pattern) => SchemaNodeType::Date { pattern },
                None => SchemaNodeType::Text,
            }
        }
        "array" => resolve_array_type(schema, ctx, depth)?,
        "object" => SchemaNodeType::Object {
            properties: resolve_property_list(schema, ctx, depth),
        },
        other => {
            error!(schema_type = other, title = ?node.title, "Unsupported schema type, no control rendered");
            return None;
        }
    };

    Some(node)
}

/// Resolve a property map and its required list into a root object node.
pub fn resolve_properties(
    properties: &Map<String, Value>,
    required: &[String],
    ctx: &mut SchemaResolutionContext,
) -> SchemaNode {
    let required: HashSet<&str> = required.iter().map(String::as_str).collect();
    let mut resolved = Vec::new();
    for (name, prop_schema) in properties {
        if let Some(mut node) = resolve_schema(prop_schema, ctx, 1) {
            node.name = Some(name.clone());
            node.required = required.contains(name.as_str());
            resolved.push((name.clone(), node));
        }
    }
    sort_by_order(&mut resolved);
    SchemaNode::new(SchemaNodeType::Object { properties: resolved })
}

/// `type` as a string, or the first non-null entry of a type array.
fn declared_type(schema: &Value) -> Option<&str> {
    match schema.get("type")? {
        Value::String(s) => Some(s.as_str()),
        Value::Array(types) => types
            .iter()
            .filter_map(|t| t.as_str())
            .find(|t| *t != "null"),
        _ => None,
    }
}

fn resolve_ref(
    ref_value: &str,
    schema: &Value,
    ctx: &mut SchemaResolutionContext,
    depth: usize,
) -> Option<SchemaNode> {
    if !ctx.enter_ref(ref_value) {
        warn!(reference = ref_value, "Circular reference, skipping node");
        return None;
    }

    let def_name = ref_value
        .strip_prefix("#/definitions/")
        .or_else(|| ref_value.strip_prefix("#/$defs/"));

    let result = match def_name.and_then(|name| ctx.definitions.get(name).cloned()) {
        Some(def_schema) => resolve_schema(&def_schema, ctx, depth + 1).map(|mut node| {
            // Sibling keywords next to $ref describe the use site
            let site = extract_common_props(schema);
            node.title = site.title.or(node.title);
            node.description = site.description.or(node.description);
            node.order = site.order.or(node.order);
            node.default = site.default.or(node.default);
            node
        }),
        None => {
            warn!(reference = ref_value, "Unresolvable reference, skipping node");
            None
        }
    };

    ctx.exit_ref(ref_value);
    result
}

fn resolve_array_type(schema: &Value, ctx: &mut SchemaResolutionContext, depth: usize) -> Option<SchemaNodeType> {
    let items = match schema.get("items") {
        Some(items_schema) => resolve_schema(items_schema, ctx, depth + 1)?,
        None => SchemaNode::new(SchemaNodeType::Text),
    };

    Some(SchemaNodeType::Array {
        items: Box::new(items),
        min_items: schema.get("minItems").and_then(|v| v.as_u64()),
        max_items: schema.get("maxItems").and_then(|v| v.as_u64()),
    })
}

fn resolve_property_list(
    schema: &Value,
    ctx: &mut SchemaResolutionContext,
    depth: usize,
) -> Vec<(String, SchemaNode)> {
    let required: HashSet<&str> = schema
        .get("required")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    let mut properties = Vec::new();
    if let Some(props) = schema.get("properties").and_then(|v| v.as_object()) {
        for (name, prop_schema) in props {
            if let Some(mut resolved) = resolve_schema(prop_schema, ctx, depth + 1) {
                resolved.name = Some(name.clone());
                resolved.required = required.contains(name.as_str());
                properties.push((name.clone(), resolved));
            }
        }
    }
    sort_by_order(&mut properties);
    properties
}

fn extract_common_props(schema: &Value) -> SchemaNode {
    let text = |key: &str| schema.get(key).and_then(|v| v.as_str()).map(String::from);

    let mut node = SchemaNode::new(SchemaNodeType::Text);
    node.title = text("title");
    node.description = text("description");
    node.pattern = text("pattern");
    node.order = schema.get("order").and_then(|v| v.as_i64());
    node.default = schema.get("default").cloned();
    node.examples = schema
        .get("examples")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    node.secret = schema
        .get("airbyte_secret")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    node
}

/// Labels for oneOf variants: title, description, const discriminator,
/// then a positional fallback.
fn generate_variant_labels(variants: &[SchemaNode]) -> Vec<String> {
    variants
        .iter()
        .enumerate()
        .map(|(i, v)| {
            if let Some(title) = &v.title {
                return title.clone();
            }
            if let Some(desc) = &v.description {
                return desc.clone();
            }
            let constant = match &v.kind {
                SchemaNodeType::Constant(val) => Some(val),
                _ => v.discriminator().map(|(_, val)| val),
            };
            match constant {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => format!("Option {}", i + 1),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolve(schema: &Value) -> Option<SchemaNode> {
        let mut ctx = SchemaResolutionContext::from_schema(schema);
        resolve_schema(schema, &mut ctx, 0)
    }

    #[test]
    fn test_resolve_simple_object() {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "age": { "type": "integer" }
            },
            "required": ["name"]
        });

        let resolved = resolve(&schema).unwrap();
        let properties = resolved.properties().unwrap();
        assert_eq!(properties.len(), 2);
        assert!(properties.iter().any(|(n, p)| n == "name" && p.required));
        assert!(properties.iter().any(|(n, p)| n == "age" && !p.required));
    }

    #[test]
    fn test_resolve_with_ref() {
        let schema = json!({
            "type": "object",
            "properties": {
                "user": { "$ref": "#/definitions/User", "title": "Owner" }
            },
            "definitions": {
                "User": {
                    "type": "object",
                    "properties": {
                        "email": { "type": "string", "format": "email" }
                    }
                }
            }
        });

        let resolved = resolve(&schema).unwrap();
        let user = resolved.property("user").unwrap();
        assert_eq!(user.title.as_deref(), Some("Owner"));
        assert_eq!(user.property("email").unwrap().kind, SchemaNodeType::Text);
    }

    #[test]
    fn test_circular_ref_is_skipped() {
        let schema = json!({
            "type": "object",
            "properties": {
                "node": { "$ref": "#/$defs/Node" }
            },
            "$defs": {
                "Node": {
                    "type": "object",
                    "properties": {
                        "label": { "type": "string" },
                        "child": { "$ref": "#/$defs/Node" }
                    }
                }
            }
        });

        let resolved = resolve(&schema).unwrap();
        let node = resolved.property("node").unwrap();
        assert!(node.property("label").is_some());
        assert!(node.property("child").is_none());
    }

    #[test]
    fn test_missing_and_unknown_types_are_skipped() {
        let schema = json!({
            "type": "object",
            "properties": {
                "host": { "type": "string" },
                "mystery": { "title": "No type" },
                "blob": { "type": "binary" }
            }
        });

        let resolved = resolve(&schema).unwrap();
        let names: Vec<&str> = resolved.properties().unwrap().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["host"]);
    }

    #[test]
    fn test_resolve_leaf_kinds() {
        let schema = json!({
            "type": "object",
            "properties": {
                "start_date": { "type": "string", "format": "date" },
                "updated": { "type": "string", "pattern": "^[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}Z$" },
                "region": { "type": "string", "enum": ["eu", "us"] },
                "kind": { "type": "string", "const": "postgres" },
                "password": { "type": "string", "airbyte_secret": true },
                "port": { "type": ["null", "integer"] }
            }
        });

        let resolved = resolve(&schema).unwrap();
        let kind = |name: &str| resolved.property(name).unwrap().kind.clone();
        assert_eq!(kind("start_date"), SchemaNodeType::Date { pattern: DatePattern::YearMonthDay });
        assert_eq!(kind("updated"), SchemaNodeType::Date { pattern: DatePattern::DateTimeSeconds });
        assert_eq!(kind("region"), SchemaNodeType::Choice { options: vec![json!("eu"), json!("us")] });
        assert_eq!(kind("kind"), SchemaNodeType::Constant(json!("postgres")));
        assert_eq!(kind("port"), SchemaNodeType::Integer);
        assert!(resolved.property("password").unwrap().secret);
    }

    #[test]
    fn test_resolve_array() {
        let schema = json!({
            "type": "array",
            "items": { "type": "string" },
            "minItems": 1,
            "maxItems": 10
        });

        let resolved = resolve(&schema).unwrap();
        if let SchemaNodeType::Array { items, min_items, max_items } = &resolved.kind {
            assert_eq!(items.kind, SchemaNodeType::Text);
            assert_eq!(*min_items, Some(1));
            assert_eq!(*max_items, Some(10));
        } else {
            panic!("Expected array type");
        }
    }

    #[test]
    fn test_variant_labels() {
        let schema = json!({
            "oneOf": [
                { "title": "No Tunnel", "properties": { "method": { "const": "NO_TUNNEL" } } },
                { "description": "Key based", "properties": { "method": { "const": "SSH_KEY_AUTH" } } },
                { "properties": { "method": { "const": "SSH_PASSWORD_AUTH" } } },
                { "type": "object", "properties": { "host": { "type": "string" } } }
            ]
        });

        let resolved = resolve(&schema).unwrap();
        if let SchemaNodeType::OneOf { variants, labels } = &resolved.kind {
            assert_eq!(variants.len(), 4);
            assert_eq!(labels, &vec!["No Tunnel", "Key based", "SSH_PASSWORD_AUTH", "Option 4"]);
        } else {
            panic!("Expected oneOf type");
        }
    }

    #[test]
    fn test_properties_sorted_by_order() {
        let properties = json!({
            "password": { "type": "string", "order": 3 },
            "ssl": { "type": "boolean" },
            "host": { "type": "string", "order": 0 },
            "port": { "type": "integer", "order": 1 }
        });
        let mut ctx = SchemaResolutionContext::default();
        let root = resolve_properties(
            properties.as_object().unwrap(),
            &["host".to_string()],
            &mut ctx,
        );

        let names: Vec<&str> = root.properties().unwrap().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["host", "port", "password", "ssl"]);
        assert!(root.property("host").unwrap().required);
    }
}
