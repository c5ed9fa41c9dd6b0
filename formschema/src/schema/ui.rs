//! UI-hints tree access.
//!
//! The UI-hints tree mirrors the schema's property paths. Every level is
//! optional: a missing entry simply means "no hint".

use serde_json::{Map, Value};

use super::SchemaPath;

/// Layout of an object. Anything but [`UI_LAYOUT_TAB`] stays inline in the
/// parent form.
pub const UI_LAYOUT: &str = "ui:layout";
/// Layout value that moves a property onto its own tab.
pub const UI_LAYOUT_TAB: &str = "tab";

/// Widget used to render a field.
pub const UI_WIDGET: &str = "ui:widget";
/// Widget given to long or `text/*` string fields.
pub const UI_WIDGET_TEXTAREA: &str = "textarea";

/// Id of the root field of a tab's form, injected per tab.
pub const UI_ROOT_FIELD_ID: &str = "ui:rootFieldId";

/// Mode directive values of `ui:create`, `ui:update` and `ui:view`.
pub const UI_HIDDEN: &str = "hidden";
pub const UI_DISABLED: &str = "disabled";

/// Find the hints object at `path`.
pub fn find<'a>(ui: &'a Value, path: &SchemaPath) -> Option<&'a Map<String, Value>> {
    let mut current = ui;
    for segment in path.segments() {
        current = current.get(segment)?;
    }
    current.as_object()
}

/// Set `key = value` on the hints object at `path`, creating missing levels.
///
/// Returns `false` when a level on the way exists but is not an object.
pub fn set(ui: &mut Value, path: &SchemaPath, key: &str, value: Value) -> bool {
    let mut current = ui;
    for segment in path.segments() {
        let Some(map) = current.as_object_mut() else {
            return false;
        };
        current = map
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    match current.as_object_mut() {
        Some(map) => {
            map.insert(key.to_string(), value);
            true
        }
        None => false,
    }
}

/// Whether the hints at `path` ask for a tab layout.
pub fn is_tab(ui: &Value, path: &SchemaPath) -> bool {
    find(ui, path)
        .and_then(|hints| hints.get(UI_LAYOUT))
        .and_then(Value::as_str)
        == Some(UI_LAYOUT_TAB)
}
