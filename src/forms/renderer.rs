//! Schema-driven form renderer.
//!
//! Walks a resolved schema tree and produces one control per leaf,
//! recursing into objects, arrays and the selected `oneOf` branch. Every
//! leaf it reaches is registered with the injected `FieldRegistry`; the
//! returned `Layout` tells the caller which leaves are mounted so that
//! leaves no longer reached can be unregistered.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::controls::{Control, InputKind, Widget};
use super::dates::{DatePattern, DisplayFormat};
use super::registry::FieldRegistry;
use super::schema::{SchemaNode, SchemaNodeType};
use crate::domain::path::PropertyPath;

/// Upper limit on entries rendered for one array, whatever the schema or
/// client state asks for.
pub const MAX_ARRAY_ITEMS: usize = 1000;

/// Interaction state that is not a field value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiState {
    /// Selected branch per `oneOf` path
    #[serde(default)]
    pub variants: BTreeMap<PropertyPath, usize>,
    /// Entry count per array path
    #[serde(default)]
    pub array_lengths: BTreeMap<PropertyPath, usize>,
}

/// What a mounted leaf accepts as input.
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    Text,
    Integer,
    Number,
    Boolean,
    Choice { options: Vec<Value>, multiple: bool },
    Constant(Value),
    Date(DatePattern),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayBounds {
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
}

/// Result of one render pass.
#[derive(Debug, Default)]
pub struct Layout {
    pub controls: Vec<Control>,
    pub leaves: BTreeMap<PropertyPath, Leaf>,
    /// Variant count per `oneOf` path
    pub variants: BTreeMap<PropertyPath, usize>,
    pub arrays: BTreeMap<PropertyPath, ArrayBounds>,
}

/// Render `root` into controls, registering unseen leaves with their seed
/// value or schema default.
pub fn render<R: FieldRegistry>(
    root: &SchemaNode,
    registry: &mut R,
    ui: &mut UiState,
    display: &DisplayFormat,
    seed: Option<&Value>,
) -> Layout {
    let mut renderer = Renderer {
        registry,
        ui,
        display,
        layout: Layout::default(),
    };
    let controls = renderer.render_children(root, &PropertyPath::root(), 0, seed);
    let mut layout = renderer.layout;
    layout.controls = controls;
    layout
}

struct Renderer<'a, R: FieldRegistry> {
    registry: &'a mut R,
    ui: &'a mut UiState,
    display: &'a DisplayFormat,
    layout: Layout,
}

impl<'a, R: FieldRegistry> Renderer<'a, R> {
    /// Controls for the fields of `node` placed at `path`: one per property
    /// for objects, otherwise a single control.
    fn render_children(
        &mut self,
        node: &SchemaNode,
        path: &PropertyPath,
        depth: usize,
        seed: Option<&Value>,
    ) -> Vec<Control> {
        match &node.kind {
            SchemaNodeType::Object { properties } => properties
                .iter()
                .map(|(name, child)| {
                    let child_seed = seed.and_then(|s| s.get(name));
                    self.render_node(child, path.push_property(name), depth, child_seed)
                })
                .collect(),
            _ => vec![self.render_node(node, path.clone(), depth, seed)],
        }
    }

    fn render_node(
        &mut self,
        node: &SchemaNode,
        path: PropertyPath,
        depth: usize,
        seed: Option<&Value>,
    ) -> Control {
        debug!(path = %path, kind = node.type_name(), depth, "Rendering field");
        let initial = seed.or(node.default.as_ref());

        let widget = match &node.kind {
            SchemaNodeType::Text | SchemaNodeType::Integer | SchemaNodeType::Number => {
                let (leaf, input) = match &node.kind {
                    SchemaNodeType::Integer => (Leaf::Integer, InputKind::Integer),
                    SchemaNodeType::Number => (Leaf::Number, InputKind::Number),
                    _ if node.secret => (Leaf::Text, InputKind::Password),
                    _ => (Leaf::Text, InputKind::Text),
                };
                let value = self.mount_leaf(&path, leaf, initial.cloned().unwrap_or(Value::Null));
                Widget::Input {
                    input,
                    value,
                    placeholder: node.examples.first().map(placeholder_text),
                }
            }
            SchemaNodeType::Boolean => {
                let value = self.mount_leaf(&path, Leaf::Boolean, initial.cloned().unwrap_or(Value::Bool(false)));
                Widget::Checkbox {
                    checked: value.as_bool().unwrap_or(false),
                }
            }
            SchemaNodeType::Choice { options } => {
                let leaf = Leaf::Choice {
                    options: options.clone(),
                    multiple: false,
                };
                let value = self.mount_leaf(&path, leaf, initial.cloned().unwrap_or(Value::Null));
                Widget::Select {
                    options: options.clone(),
                    multiple: false,
                    fixed: false,
                    selected: selection(&value),
                }
            }
            SchemaNodeType::Constant(constant) => {
                self.mount_leaf(&path, Leaf::Constant(constant.clone()), constant.clone());
                // A const field always submits its value
                self.registry.set_value(&path, constant.clone());
                Widget::Select {
                    options: vec![constant.clone()],
                    multiple: false,
                    fixed: true,
                    selected: vec![constant.clone()],
                }
            }
            SchemaNodeType::Date { pattern } => {
                let normalized = initial
                    .and_then(|v| v.as_str())
                    .and_then(|s| pattern.normalize(s, self.display))
                    .map(Value::String)
                    .unwrap_or(Value::Null);
                let value = self.mount_leaf(&path, Leaf::Date(*pattern), normalized);
                let display = value
                    .as_str()
                    .and_then(|s| pattern.to_display(s, self.display));
                Widget::Date {
                    pattern: *pattern,
                    with_time: pattern.has_time(),
                    value,
                    display,
                }
            }
            SchemaNodeType::Array { items, min_items, max_items } => {
                self.render_array(node, items, *min_items, *max_items, &path, depth, initial)
            }
            SchemaNodeType::Object { .. } => Widget::Section {
                fields: self.render_children(node, &path, depth + 1, initial),
            },
            SchemaNodeType::OneOf { variants, labels } => {
                let selected = self.selected_variant(&path, variants, initial);
                self.layout.variants.insert(path.clone(), variants.len());
                let fields = self.render_children(&variants[selected], &path, depth + 1, initial);
                Widget::Variant {
                    labels: labels.clone(),
                    selected,
                    fields,
                }
            }
        };

        Control {
            label: node.label(),
            description: node.description.clone(),
            required: node.required,
            depth,
            path,
            widget,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn render_array(
        &mut self,
        node: &SchemaNode,
        items: &SchemaNode,
        min_items: Option<u64>,
        max_items: Option<u64>,
        path: &PropertyPath,
        depth: usize,
        initial: Option<&Value>,
    ) -> Widget {
        // Array of enum values is a single multi-select leaf
        if let SchemaNodeType::Choice { options } = &items.kind {
            let leaf = Leaf::Choice {
                options: options.clone(),
                multiple: true,
            };
            let value = self.mount_leaf(path, leaf, initial.cloned().unwrap_or(Value::Null));
            return Widget::Select {
                options: options.clone(),
                multiple: true,
                fixed: false,
                selected: selection(&value),
            };
        }

        let requested = match self.ui.array_lengths.get(path) {
            Some(count) => *count,
            None => initial
                .and_then(|v| v.as_array())
                .map(Vec::len)
                .unwrap_or_else(|| min_items.unwrap_or(0) as usize),
        };
        let count = clamp_count(requested, min_items, max_items);
        if count != requested {
            warn!(path = %path, requested, count, "Array length outside schema bounds, clamped");
        }
        self.ui.array_lengths.insert(path.clone(), count);
        self.layout.arrays.insert(path.clone(), ArrayBounds { min_items, max_items });

        let nested = matches!(items.kind, SchemaNodeType::Object { .. } | SchemaNodeType::OneOf { .. });
        let entries: Vec<Control> = (0..count)
            .map(|i| {
                let entry_seed = initial.and_then(|v| v.get(i));
                let mut entry = self.render_node(items, path.push_index(i), depth + 1, entry_seed);
                entry.label = format!("{} {}", item_label(node, items), i + 1);
                entry
            })
            .collect();

        Widget::List {
            items: entries,
            nested,
            can_add: count < clamp_count(usize::MAX, min_items, max_items),
            can_remove: min_items.map_or(count > 0, |min| (count as u64) > min),
        }
    }

    fn selected_variant(&mut self, path: &PropertyPath, variants: &[SchemaNode], initial: Option<&Value>) -> usize {
        let selected = match self.ui.variants.get(path) {
            Some(idx) if *idx < variants.len() => *idx,
            _ => initial
                .and_then(|value| variants.iter().position(|v| v.matches_discriminators(value)))
                .unwrap_or(0),
        };
        self.ui.variants.insert(path.clone(), selected);
        selected
    }

    /// Register the leaf if it is not mounted yet and return its value.
    fn mount_leaf(&mut self, path: &PropertyPath, leaf: Leaf, initial: Value) -> Value {
        if !self.registry.is_registered(path) {
            debug!(path = %path, "Registering field");
            self.registry.register(path, initial);
        }
        self.layout.leaves.insert(path.clone(), leaf);
        self.registry.value(path).cloned().unwrap_or(Value::Null)
    }
}

/// Entry count kept within `[min_items, max_items]` and [`MAX_ARRAY_ITEMS`].
pub(crate) fn clamp_count(requested: usize, min_items: Option<u64>, max_items: Option<u64>) -> usize {
    let to_usize = |n: u64| usize::try_from(n).unwrap_or(usize::MAX);
    let max = max_items.map_or(MAX_ARRAY_ITEMS, |m| to_usize(m).min(MAX_ARRAY_ITEMS));
    let min = min_items.map_or(0, to_usize).min(max);
    requested.clamp(min, max)
}

fn item_label(array: &SchemaNode, items: &SchemaNode) -> String {
    items
        .title
        .clone()
        .unwrap_or_else(|| format!("{} item", array.label()))
}

fn placeholder_text(example: &Value) -> String {
    match example {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn selection(value: &Value) -> Vec<Value> {
    match value {
        Value::Null => vec![],
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}
