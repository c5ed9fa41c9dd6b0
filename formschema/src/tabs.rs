//! Tabbed form state.
//!
//! Keeps the data and validation errors of a form that was split into tabs
//! with [`split_schema`]. A rendering layer shows one form per
//! [`SubSchema`], feeds it [`TabbedForm::form_data`] and
//! [`TabbedForm::ui_schema`], and reports each change back through
//! [`TabbedForm::apply_change`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    schema::{
        KEY_TYPE,
        ui::{UI_LAYOUT, UI_LAYOUT_TAB, UI_ROOT_FIELD_ID},
    },
    splitter::{ROOT_KEY, SubSchema, split_schema},
};

/// Merged data and per-tab errors of the whole form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabbedFormResult {
    pub data: Map<String, Value>,
    /// Errors by tab key. A tab without errors has no entry.
    pub errors: Map<String, Value>,
}

impl TabbedFormResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// UI hints for the form rendering the group `key`.
///
/// The root group gets the whole hints tree, a tab gets the hints of its
/// property. Both get `ui:rootFieldId` and the tab layout unless the hints
/// override them.
pub fn tab_ui_schema(key: &str, ui_schema: Option<&Value>) -> Value {
    let mut hints = Map::new();
    hints.insert(UI_ROOT_FIELD_ID.to_string(), Value::String(key.to_string()));
    hints.insert(UI_LAYOUT.to_string(), Value::String(UI_LAYOUT_TAB.to_string()));

    let source = match ui_schema {
        Some(ui) if key == ROOT_KEY => Some(ui),
        Some(ui) => ui.get(key),
        None => None,
    };
    if let Some(Value::Object(source)) = source {
        for (k, v) in source {
            hints.insert(k.clone(), v.clone());
        }
    }
    Value::Object(hints)
}

/// Form state spread across the groups of a split schema.
#[derive(Debug, Clone)]
pub struct TabbedForm {
    groups: Vec<SubSchema>,
    ui_schema: Option<Value>,
    result: TabbedFormResult,
}

impl TabbedForm {
    /// Split `schema` by the layout hints in `ui_schema` and start from
    /// `data`.
    pub fn new(schema: &Value, ui_schema: Option<Value>, data: Map<String, Value>) -> Self {
        let groups = split_schema(schema, ui_schema.as_ref());
        Self {
            groups,
            ui_schema,
            result: TabbedFormResult {
                data,
                errors: Map::new(),
            },
        }
    }

    /// All groups, the root group first.
    pub fn tabs(&self) -> &[SubSchema] {
        &self.groups
    }

    /// The group with `key`, if the schema has one.
    pub fn tab(&self, key: &str) -> Option<&SubSchema> {
        self.groups.iter().find(|g| g.key == key)
    }

    /// Whether the form needs a tab bar, i.e. has more than the root group.
    pub fn is_tabbed(&self) -> bool {
        self.groups.len() > 1
    }

    /// Data shown by the form of group `key`.
    pub fn form_data(&self, key: &str) -> Value {
        if key == ROOT_KEY {
            return Value::Object(self.result.data.clone());
        }
        self.result
            .data
            .get(key)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    /// UI hints for the form of group `key`; see [`tab_ui_schema`].
    pub fn ui_schema(&self, key: &str) -> Value {
        tab_ui_schema(key, self.ui_schema.as_ref())
    }

    /// Merge the data and errors one group reported into the whole form.
    ///
    /// Root data is merged field by field. An object tab is merged into the
    /// existing object under its key; anything else replaces it.
    pub fn apply_change(&mut self, key: &str, data: Value, errors: Vec<Value>) {
        if errors.is_empty() {
            self.result.errors.remove(key);
        } else {
            self.result
                .errors
                .insert(key.to_string(), Value::Array(errors));
        }

        if key == ROOT_KEY {
            if let Value::Object(fields) = data {
                self.result.data.extend(fields);
            }
            return;
        }

        let object_tab = self
            .tab(key)
            .and_then(|g| g.schema.get(KEY_TYPE))
            .and_then(Value::as_str)
            == Some("object");
        let merge = object_tab
            && data.is_object()
            && self.result.data.get(key).is_some_and(Value::is_object);
        if !merge {
            self.result.data.insert(key.to_string(), data);
        } else if let (Some(Value::Object(existing)), Value::Object(fields)) =
            (self.result.data.get_mut(key), data)
        {
            existing.extend(fields);
        }
    }

    /// Data and errors collected so far.
    pub fn result(&self) -> &TabbedFormResult {
        &self.result
    }

    /// Finish editing and hand out the collected result.
    pub fn into_result(self) -> TabbedFormResult {
        self.result
    }
}
