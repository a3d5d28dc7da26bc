//! Resolved schema tree consumed by the renderer.

use serde_json::Value;

use super::dates::DatePattern;
use crate::domain::path::{PathSegment, PropertyPath};

/// A schema node with all `$ref`s resolved and its kind decided.
#[derive(Clone, Debug, PartialEq)]
pub struct SchemaNode {
    pub kind: SchemaNodeType,
    /// Property name (if this is a property)
    pub name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub required: bool,
    /// Display position among siblings; unordered properties go last
    pub order: Option<i64>,
    pub default: Option<Value>,
    pub pattern: Option<String>,
    pub examples: Vec<Value>,
    /// `airbyte_secret`: rendered as a password input
    pub secret: bool,
}

impl SchemaNode {
    pub fn new(kind: SchemaNodeType) -> Self {
        Self {
            kind,
            name: None,
            title: None,
            description: None,
            required: false,
            order: None,
            default: None,
            pattern: None,
            examples: Vec::new(),
            secret: false,
        }
    }

    /// Title, falling back to the property name.
    pub fn label(&self) -> String {
        self.title
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_default()
    }

    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            SchemaNodeType::Text => "string",
            SchemaNodeType::Integer => "integer",
            SchemaNodeType::Number => "number",
            SchemaNodeType::Boolean => "boolean",
            SchemaNodeType::Choice { .. } => "enum",
            SchemaNodeType::Constant(_) => "const",
            SchemaNodeType::Date { .. } => "date",
            SchemaNodeType::Array { .. } => "array",
            SchemaNodeType::Object { .. } => "object",
            SchemaNodeType::OneOf { .. } => "oneOf",
        }
    }

    pub fn properties(&self) -> Option<&[(String, SchemaNode)]> {
        match &self.kind {
            SchemaNodeType::Object { properties } => Some(properties),
            _ => None,
        }
    }

    pub fn property(&self, name: &str) -> Option<&SchemaNode> {
        self.properties()?
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, node)| node)
    }

    /// Value of the first `const` property, used as a variant discriminator.
    pub fn discriminator(&self) -> Option<(&str, &Value)> {
        self.properties()?.iter().find_map(|(name, node)| match &node.kind {
            SchemaNodeType::Constant(value) => Some((name.as_str(), value)),
            _ => None,
        })
    }

    /// True when every `const` property of this object agrees with `value`
    /// and there is at least one.
    pub fn matches_discriminators(&self, value: &Value) -> bool {
        let Some(properties) = self.properties() else {
            return false;
        };
        let constants = properties.iter().filter_map(|(name, node)| match &node.kind {
            SchemaNodeType::Constant(c) => Some((name, c)),
            _ => None,
        });
        let mut matched = false;
        for (name, expected) in constants {
            if value.get(name) != Some(expected) {
                return false;
            }
            matched = true;
        }
        matched
    }

    /// Node addressed by `path`, relative to this node. Array indices step
    /// into `items`; `oneOf` nodes are searched through every variant.
    pub fn find(&self, path: &PropertyPath) -> Option<&SchemaNode> {
        let segments: Vec<&PathSegment> = path.segments().collect();
        self.find_segments(&segments)
    }

    fn find_segments(&self, segments: &[&PathSegment]) -> Option<&SchemaNode> {
        let Some((first, rest)) = segments.split_first() else {
            return Some(self);
        };
        match (&self.kind, first) {
            (SchemaNodeType::Object { .. }, PathSegment::Property(name)) => {
                self.property(name)?.find_segments(rest)
            }
            (SchemaNodeType::Array { items, .. }, PathSegment::Index(_)) => items.find_segments(rest),
            (SchemaNodeType::OneOf { variants, .. }, _) => variants
                .iter()
                .find_map(|variant| variant.find_segments(segments)),
            _ => None,
        }
    }
}

/// Closed set of node kinds the renderer understands.
#[derive(Clone, Debug, PartialEq)]
pub enum SchemaNodeType {
    Text,
    Integer,
    Number,
    Boolean,
    /// `enum` values
    Choice { options: Vec<Value> },
    /// `const`: a single preselected option
    Constant(Value),
    Date { pattern: DatePattern },
    Array {
        items: Box<SchemaNode>,
        min_items: Option<u64>,
        max_items: Option<u64>,
    },
    /// Properties in display order
    Object { properties: Vec<(String, SchemaNode)> },
    OneOf {
        variants: Vec<SchemaNode>,
        labels: Vec<String>,
    },
}

/// Stable sort by `order`, unordered properties last.
pub fn sort_by_order(properties: &mut [(String, SchemaNode)]) {
    properties.sort_by_key(|(_, node)| match node.order {
        Some(order) => (0, order),
        None => (1, 0),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn named(name: &str, kind: SchemaNodeType, order: Option<i64>) -> (String, SchemaNode) {
        let mut node = SchemaNode::new(kind);
        node.name = Some(name.to_string());
        node.order = order;
        (name.to_string(), node)
    }

    #[test]
    fn test_sort_by_order_is_stable_with_unordered_last() {
        let mut props = vec![
            named("c", SchemaNodeType::Text, None),
            named("b", SchemaNodeType::Text, Some(2)),
            named("d", SchemaNodeType::Text, None),
            named("a", SchemaNodeType::Text, Some(0)),
            named("e", SchemaNodeType::Text, Some(2)),
        ];
        sort_by_order(&mut props);
        let names: Vec<&str> = props.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "e", "c", "d"]);
    }

    #[test]
    fn test_find_through_array_and_variants() {
        let ssh = SchemaNode::new(SchemaNodeType::Object {
            properties: vec![
                named("method", SchemaNodeType::Constant(json!("SSH_KEY_AUTH")), None),
                named("ssh_key", SchemaNodeType::Text, None),
            ],
        });
        let tunnel = SchemaNode::new(SchemaNodeType::OneOf {
            variants: vec![ssh],
            labels: vec!["SSH".to_string()],
        });
        let streams = SchemaNode::new(SchemaNodeType::Array {
            items: Box::new(SchemaNode::new(SchemaNodeType::Object {
                properties: vec![named("name", SchemaNodeType::Text, None)],
            })),
            min_items: None,
            max_items: None,
        });
        let root = SchemaNode::new(SchemaNodeType::Object {
            properties: vec![("tunnel".to_string(), tunnel), ("streams".to_string(), streams)],
        });

        let found = root.find(&PropertyPath::parse("tunnel.ssh_key")).unwrap();
        assert_eq!(found.kind, SchemaNodeType::Text);
        assert!(root.find(&PropertyPath::parse("streams[3].name")).is_some());
        assert!(root.find(&PropertyPath::parse("streams.name")).is_none());
    }

    #[test]
    fn test_matches_discriminators() {
        let variant = SchemaNode::new(SchemaNodeType::Object {
            properties: vec![
                named("mode", SchemaNodeType::Constant(json!("verify-full")), None),
                named("ca_certificate", SchemaNodeType::Text, None),
            ],
        });
        assert!(variant.matches_discriminators(&json!({"mode": "verify-full"})));
        assert!(!variant.matches_discriminators(&json!({"mode": "disable"})));
        assert_eq!(variant.discriminator(), Some(("mode", &json!("verify-full"))));

        let no_const = SchemaNode::new(SchemaNodeType::Object { properties: vec![] });
        assert!(!no_const.matches_discriminators(&json!({})));
    }
}
