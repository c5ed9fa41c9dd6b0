//! Schema Splitter.
//!
//! Partitions the top-level properties of a schema into tab-sized
//! sub-schemas. Properties whose UI hints ask for `"ui:layout": "tab"` and
//! that can hold nested fields (objects, arrays and `$ref`s) get their own
//! group; everything else lands in the general root group.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::{
    DRAFT_07, KEY_DEFINITIONS, KEY_PROPERTIES, KEY_READ_ONLY, KEY_REQUIRED, KEY_SCHEMA, KEY_TYPE,
    SchemaPath, ref_of, title_of, ui,
};

/// Key of the general group holding all properties without their own tab.
pub const ROOT_KEY: &str = "_root_";

/// Label of the general group when the schema has no `title`.
pub const ROOT_LABEL: &str = "General";

/// One group of the split schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubSchema {
    /// [`ROOT_KEY`] for the general group, the property name otherwise.
    pub key: String,
    pub label: String,
    pub schema: Value,
}

impl SubSchema {
    pub fn is_root(&self) -> bool {
        self.key == ROOT_KEY
    }
}

/// Split `schema` into the root group followed by one group per tab property.
///
/// The root group is always present, even when every property went into a
/// tab of its own or the schema has no properties.
pub fn split_schema(schema: &Value, ui_schema: Option<&Value>) -> Vec<SubSchema> {
    let empty = Map::new();
    let root = schema.as_object().unwrap_or(&empty);
    let meta_schema = root
        .get(KEY_SCHEMA)
        .cloned()
        .unwrap_or_else(|| Value::String(DRAFT_07.to_string()));

    let mut general = Map::new();
    let mut tabs = Vec::new();

    if let Some(Value::Object(properties)) = root.get(KEY_PROPERTIES) {
        for (name, prop) in properties {
            let tab = ui_schema.is_some_and(|ui| ui::is_tab(ui, &SchemaPath::root().child(name.as_str())));
            match prop.as_object() {
                Some(prop) if tab && can_be_tab(prop) => {
                    let mut sub = prop.clone();
                    sub.insert(KEY_SCHEMA.to_string(), meta_schema.clone());
                    inherit(&mut sub, root, KEY_DEFINITIONS);
                    inherit(&mut sub, root, KEY_READ_ONLY);
                    tabs.push(SubSchema {
                        key: name.clone(),
                        label: title_of(prop).unwrap_or(name).to_string(),
                        schema: Value::Object(sub),
                    });
                }
                _ => {
                    general.insert(name.clone(), prop.clone());
                }
            }
        }
    }

    let mut general_schema = Map::new();
    general_schema.insert(KEY_SCHEMA.to_string(), meta_schema);
    general_schema.insert(
        KEY_TYPE.to_string(),
        root.get(KEY_TYPE)
            .cloned()
            .unwrap_or_else(|| Value::String("object".to_string())),
    );
    general_schema.insert(KEY_PROPERTIES.to_string(), Value::Object(general));
    inherit(&mut general_schema, root, KEY_DEFINITIONS);
    inherit(&mut general_schema, root, KEY_READ_ONLY);
    inherit(&mut general_schema, root, KEY_REQUIRED);

    let mut groups = Vec::with_capacity(tabs.len() + 1);
    groups.push(SubSchema {
        key: ROOT_KEY.to_string(),
        label: title_of(root).unwrap_or(ROOT_LABEL).to_string(),
        schema: Value::Object(general_schema),
    });
    groups.extend(tabs);
    groups
}

/// Effective type is `ref` (a `$ref` without `type`), `object` or `array`.
fn can_be_tab(prop: &Map<String, Value>) -> bool {
    match prop.get(KEY_TYPE).and_then(Value::as_str) {
        Some("object" | "array") => true,
        Some(_) => false,
        None => ref_of(prop).is_some(),
    }
}

/// Copy `key` from `parent` into `target` when the parent has it.
///
/// The tab inherits the parent's value even if it declared its own, which
/// keeps `definitions` shared by every group.
fn inherit(target: &mut Map<String, Value>, parent: &Map<String, Value>, key: &str) {
    if let Some(value) = parent.get(key) {
        target.insert(key.to_string(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use serde_json::json;

    use super::*;

    fn sample() -> Value {
        json!({
            "title": "Workflow",
            "type": "object",
            "readOnly": true,
            "required": ["name"],
            "definitions": {"Step": {"type": "object", "properties": {"id": {"type": "string"}}}},
            "properties": {
                "name": {"type": "string"},
                "config": {"type": "object", "title": "Configuration", "properties": {"x": {"type": "number"}}},
                "steps": {"type": "array", "items": {"$ref": "#/definitions/Step"}},
                "main": {"$ref": "#/definitions/Step"},
                "label": {"type": "string"},
                "inline": {"type": "object", "properties": {}}
            }
        })
    }

    fn ui_hints() -> Value {
        json!({
            "config": {"ui:layout": "tab"},
            "steps": {"ui:layout": "tab"},
            "main": {"ui:layout": "tab"},
            "label": {"ui:layout": "tab"},
            "inline": {"ui:layout": "inline"}
        })
    }

    #[test]
    fn test_split_groups_and_labels() {
        let groups = split_schema(&sample(), Some(&ui_hints()));
        let keys: Vec<_> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec![ROOT_KEY, "config", "steps", "main"]);

        let labels: Vec<_> = groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["Workflow", "Configuration", "steps", "main"]);
    }

    #[test]
    fn test_root_group_metadata() {
        let groups = split_schema(&sample(), Some(&ui_hints()));
        let root = &groups[0].schema;
        assert_eq!(root["$schema"], json!(DRAFT_07));
        assert_eq!(root["type"], json!("object"));
        assert_eq!(root["readOnly"], json!(true));
        assert_eq!(root["required"], json!(["name"]));
        assert_eq!(root["definitions"], sample()["definitions"]);
        let general: Vec<_> = root["properties"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(general, vec!["name", "label", "inline"]);
    }

    #[test]
    fn test_tab_inherits_parent_metadata() {
        let groups = split_schema(&sample(), Some(&ui_hints()));
        let main = &groups[3].schema;
        assert_eq!(main["$ref"], json!("#/definitions/Step"));
        assert_eq!(main["$schema"], json!(DRAFT_07));
        assert_eq!(main["readOnly"], json!(true));
        assert_eq!(main["definitions"], sample()["definitions"]);
        assert!(main.get("required").is_none());
    }

    #[test]
    fn test_partition_is_complete() {
        let schema = sample();
        let groups = split_schema(&schema, Some(&ui_hints()));
        let mut seen = Vec::new();
        for group in &groups {
            if group.is_root() {
                seen.extend(group.schema["properties"].as_object().unwrap().keys().cloned());
            } else {
                seen.push(group.key.clone());
            }
        }
        let unique: BTreeSet<_> = seen.iter().cloned().collect();
        assert_eq!(unique.len(), seen.len());
        let original: BTreeSet<_> = schema["properties"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(unique, original);
    }

    #[test]
    fn test_no_hints_and_no_properties() {
        let groups = split_schema(&sample(), None);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].schema["properties"].as_object().unwrap().len(), 6);

        let groups = split_schema(&json!({}), None);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].label, ROOT_LABEL);
        assert_eq!(groups[0].schema["properties"], json!({}));
        assert!(groups[0].schema.get("definitions").is_none());
    }
}
