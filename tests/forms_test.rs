use agentcloud::domain::PropertyPath;
use agentcloud::forms::{
    root_from_json_schema, DisplayFormat, FieldRegistry, FormAction, FormError, FormSession, FormState, UiState,
    Widget,
};
use serde_json::{json, Value};
use std::collections::HashMap;

fn path(s: &str) -> PropertyPath {
    PropertyPath::parse(s)
}

fn postgres_schema() -> Value {
    json!({
        "type": "object",
        "required": ["host", "database"],
        "properties": {
            "database": { "type": "string", "title": "Database", "order": 1 },
            "host": { "type": "string", "title": "Host", "order": 0 },
            "start_date": { "type": "string", "format": "date", "title": "Start date" },
            "tunnel_method": {
                "type": "object",
                "title": "SSH tunnel",
                "order": 2,
                "oneOf": [
                    {
                        "title": "No Tunnel",
                        "properties": { "tunnel_method": { "const": "NO_TUNNEL" } }
                    },
                    {
                        "title": "Password Authentication",
                        "properties": {
                            "tunnel_method": { "const": "SSH_PASSWORD_AUTH" },
                            "tunnel_host": { "type": "string" },
                            "tunnel_user_password": { "type": "string", "airbyte_secret": true }
                        }
                    }
                ]
            },
            "streams": {
                "type": "array",
                "title": "Streams",
                "order": 3,
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "sync_mode": { "type": "string", "enum": ["full_refresh", "incremental"] }
                    }
                }
            }
        }
    })
}

fn open() -> FormSession {
    FormSession::from_json_schema(&postgres_schema(), DisplayFormat::default(), 20).unwrap()
}

/// Registry backed by a hash map that records every mount and unmount.
#[derive(Default)]
struct RecordingRegistry {
    fields: HashMap<PropertyPath, Value>,
    mounted: Vec<String>,
    unmounted: Vec<String>,
}

impl FieldRegistry for RecordingRegistry {
    fn register(&mut self, path: &PropertyPath, initial: Value) {
        self.mounted.push(path.to_string());
        self.fields.insert(path.clone(), initial);
    }

    fn unregister(&mut self, path: &PropertyPath) {
        self.unmounted.push(path.to_string());
        self.fields.remove(path);
    }

    fn set_value(&mut self, path: &PropertyPath, value: Value) -> bool {
        match self.fields.get_mut(path) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    fn value(&self, path: &PropertyPath) -> Option<&Value> {
        self.fields.get(path)
    }

    fn values(&self) -> Vec<(PropertyPath, Value)> {
        let mut values: Vec<_> = self.fields.iter().map(|(p, v)| (p.clone(), v.clone())).collect();
        values.sort_by(|a, b| a.0.cmp(&b.0));
        values
    }
}

#[test]
fn test_controls_follow_property_order() {
    let form = open();
    let paths: Vec<String> = form.controls().iter().map(|c| c.path.to_string()).collect();
    // unordered properties sort last
    assert_eq!(paths, vec!["host", "database", "tunnel_method", "streams", "start_date"]);
    assert!(form.controls()[0].required);
    assert_eq!(form.controls()[0].label, "Host");
}

#[test]
fn test_date_round_trip() {
    let mut form = open();
    form.set_input(&path("start_date"), json!("31/12/2023")).unwrap();
    assert_eq!(form.submission()["start_date"], json!("2023-12-31"));

    let root = root_from_json_schema(&postgres_schema(), 20).unwrap();
    let reopened = FormSession::with_values(
        root,
        FormState::new(),
        DisplayFormat::default(),
        &json!({ "start_date": "2023-12-31" }),
    );
    let control = reopened
        .controls()
        .iter()
        .find(|c| c.path == path("start_date"))
        .unwrap();
    match &control.widget {
        Widget::Date { display, .. } => assert_eq!(display.as_deref(), Some("31/12/2023")),
        other => panic!("expected a date control, got {:?}", other),
    }
}

#[test]
fn test_variant_switch_unregisters_previous_branch() {
    let root = root_from_json_schema(&postgres_schema(), 20).unwrap();
    let mut form = FormSession::new(root, RecordingRegistry::default(), DisplayFormat::default());
    assert_eq!(form.submission()["tunnel_method"], json!({ "tunnel_method": "NO_TUNNEL" }));

    form.select_variant(&path("tunnel_method"), 1).unwrap();
    assert!(form.registry().mounted.contains(&"tunnel_method.tunnel_host".to_string()));
    form.set_input(&path("tunnel_method.tunnel_host"), json!("bastion")).unwrap();
    form.set_input(&path("tunnel_method.tunnel_user_password"), json!("secret")).unwrap();

    form.select_variant(&path("tunnel_method"), 0).unwrap();
    assert!(form
        .registry()
        .unmounted
        .contains(&"tunnel_method.tunnel_host".to_string()));
    assert!(!form.registry().is_registered(&path("tunnel_method.tunnel_user_password")));
    assert_eq!(form.submission()["tunnel_method"], json!({ "tunnel_method": "NO_TUNNEL" }));

    // switching back starts from a clean branch
    form.select_variant(&path("tunnel_method"), 1).unwrap();
    assert!(form.submission()["tunnel_method"].get("tunnel_host").is_none());
}

#[test]
fn test_existing_values_select_variant() {
    let root = root_from_json_schema(&postgres_schema(), 20).unwrap();
    let values = json!({
        "host": "db",
        "tunnel_method": { "tunnel_method": "SSH_PASSWORD_AUTH", "tunnel_host": "bastion" },
        "streams": [{ "name": "users", "sync_mode": "incremental" }]
    });
    let form = FormSession::with_values(root, FormState::new(), DisplayFormat::default(), &values);

    assert_eq!(form.ui_state().variants.get(&path("tunnel_method")), Some(&1));
    assert_eq!(form.value(&path("tunnel_method.tunnel_host")), Some(&json!("bastion")));
    assert_eq!(form.value(&path("streams[0].sync_mode")), Some(&json!("incremental")));
    assert_eq!(form.submission()["streams"], json!([{ "name": "users", "sync_mode": "incremental" }]));
}

#[test]
fn test_object_array_actions() {
    let mut form = open();
    let actions: Vec<FormAction> = serde_json::from_value(json!([
        { "op": "add_item", "path": "streams" },
        { "op": "add_item", "path": "streams" },
        { "op": "set", "path": "streams[0].name", "value": "users" },
        { "op": "set", "path": "streams[1].name", "value": "orders" },
        { "op": "set", "path": "streams[1].sync_mode", "value": "incremental" },
        { "op": "remove_item", "path": "streams", "index": 0 }
    ]))
    .unwrap();
    for action in &actions {
        form.apply(action).unwrap();
    }

    assert_eq!(
        form.submission()["streams"],
        json!([{ "name": "orders", "sync_mode": "incremental" }])
    );
    assert!(matches!(
        form.remove_item(&path("streams"), 3),
        Err(FormError::NoSuchItem { index: 3, .. })
    ));
}

#[test]
fn test_restored_array_length_respects_max_items() {
    let schema = json!({
        "type": "object",
        "properties": {
            "hosts": { "type": "array", "items": { "type": "string" }, "maxItems": 2 }
        }
    });
    let root = root_from_json_schema(&schema, 20).unwrap();
    let mut ui = UiState::default();
    ui.array_lengths.insert(path("hosts"), 50);

    let mut form = FormSession::restore(root, FormState::new(), DisplayFormat::default(), ui, None);

    let Widget::List { items, .. } = &form.controls()[0].widget else {
        panic!("expected a list control");
    };
    assert_eq!(items.len(), 2);
    assert_eq!(form.ui_state().array_lengths.get(&path("hosts")), Some(&2));
    assert!(matches!(
        form.add_item(&path("hosts")),
        Err(FormError::TooManyItems { max: 2, .. })
    ));
}

#[test]
fn test_offset_display_format_renders_without_display_text() {
    let schema = json!({
        "type": "object",
        "properties": {
            "start_date": { "type": "string", "format": "date", "default": "2024-01-15" }
        }
    });
    let display = DisplayFormat {
        date: "%d/%m/%Y %z".to_string(),
        date_time: "%d/%m/%Y %H:%M %z".to_string(),
    };
    let form = FormSession::from_json_schema(&schema, display, 20).unwrap();

    match &form.controls()[0].widget {
        Widget::Date { value, display, .. } => {
            assert_eq!(value, &json!("2024-01-15"));
            assert_eq!(display, &None);
        }
        other => panic!("expected a date control, got {:?}", other),
    }
}

#[test]
fn test_schema_without_properties_is_rejected() {
    let result = FormSession::<FormState>::from_json_schema(&json!({ "type": "object" }), DisplayFormat::default(), 20);
    assert!(matches!(result, Err(FormError::NoProperties)));
}
