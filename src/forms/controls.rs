//! Serializable control tree produced by the renderer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::dates::DatePattern;
use crate::domain::path::PropertyPath;

/// One rendered control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Control {
    pub path: PropertyPath,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    /// Indentation level; nested groups sit one level deeper
    pub depth: usize,
    #[serde(flatten)]
    pub widget: Widget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Text,
    Password,
    Integer,
    Number,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "widget", rename_all = "snake_case")]
pub enum Widget {
    Input {
        input: InputKind,
        value: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder: Option<String>,
    },
    Checkbox {
        checked: bool,
    },
    /// Single or multi-select; a `const` field is a fixed single option
    Select {
        options: Vec<Value>,
        multiple: bool,
        fixed: bool,
        selected: Vec<Value>,
    },
    Date {
        pattern: DatePattern,
        with_time: bool,
        value: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        display: Option<String>,
    },
    /// Repeatable entries; `nested` entries are sub-forms
    List {
        items: Vec<Control>,
        nested: bool,
        can_add: bool,
        can_remove: bool,
    },
    Variant {
        labels: Vec<String>,
        selected: usize,
        fields: Vec<Control>,
    },
    Section {
        fields: Vec<Control>,
    },
}

impl Control {
    /// Depth-first iterator over this control and everything nested in it.
    pub fn walk(&self) -> Vec<&Control> {
        let mut out = vec![self];
        let children: &[Control] = match &self.widget {
            Widget::List { items, .. } => items,
            Widget::Variant { fields, .. } | Widget::Section { fields } => fields,
            _ => &[],
        };
        for child in children {
            out.extend(child.walk());
        }
        out
    }
}
