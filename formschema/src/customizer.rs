//! Schema Customizer.
//!
//! Adapts a schema and its UI hints to an [`EditMode`]:
//!
//! - `View` marks the whole form read-only.
//! - `ui:create` / `ui:update` / `ui:view` directives hide (`hidden`) or
//!   disable (`disabled`) a node in the matching mode. Hidden nodes are
//!   deleted from the schema rather than given a hidden widget. Both
//!   directives drop the property from the enclosing object's `required`
//!   list.
//! - Long text (`maxLength > 100`) and `text/*` content get a textarea widget.

use std::{fmt, str::FromStr};

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::SchemaError,
    schema::{
        KEY_READ_ONLY, KEY_REQUIRED, NodeKind, SchemaPath,
        ui::{self, UI_DISABLED, UI_HIDDEN, UI_WIDGET, UI_WIDGET_TEXTAREA},
    },
    walker::{SchemaProcessor, Visit, process_schema},
};

/// Nodes with a longer `maxLength` are edited in a textarea.
pub const TEXTAREA_MIN_LENGTH: u64 = 100;

/// Which kind of editing the form is used for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    #[default]
    Create,
    Update,
    View,
}

impl EditMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::View => "view",
        }
    }

    /// UI-hints key holding the directive for this mode, e.g. `ui:update`.
    pub fn directive_key(&self) -> String {
        format!("ui:{}", self.as_str())
    }
}

impl fmt::Display for EditMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EditMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "view" => Ok(Self::View),
            other => Err(format!("unknown edit mode `{other}`")),
        }
    }
}

/// Schema, UI hints and mode, both as input and as output of
/// [`customize_schemas`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomizeSchemas {
    pub schema: Value,
    pub ui_schema: Value,
    pub edit_mode: EditMode,
}

/// Customize `props.schema` and `props.ui_schema` for `props.edit_mode`.
///
/// The returned schemas are independent copies; the inputs are not touched.
///
/// # Errors
///
/// Propagates walker errors (union types, unsupported or unresolved `$ref`).
pub fn customize_schemas(props: &CustomizeSchemas) -> Result<CustomizeSchemas, SchemaError> {
    let mut schema = props.schema.clone();
    if props.edit_mode == EditMode::View
        && let Some(root) = schema.as_object_mut()
    {
        root.insert(KEY_READ_ONLY.to_string(), Value::Bool(true));
    }

    let mut customizer = Customizer {
        ui_schema: props.ui_schema.clone(),
        directive_key: props.edit_mode.directive_key(),
        owners: Vec::new(),
    };
    let schema = process_schema(&schema, &mut customizer)?.unwrap_or(schema);

    Ok(CustomizeSchemas {
        schema,
        ui_schema: customizer.ui_schema,
        edit_mode: props.edit_mode,
    })
}

/// Mode directive found in the UI hints of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
    Hidden,
    Disabled,
}

impl Directive {
    fn parse(value: &Value) -> Option<Self> {
        match value.as_str()? {
            UI_HIDDEN => Some(Self::Hidden),
            UI_DISABLED => Some(Self::Disabled),
            _ => None,
        }
    }
}

struct Customizer {
    ui_schema: Value,
    directive_key: String,
    /// Names to drop from `required`, one frame per object being descended.
    owners: Vec<Vec<String>>,
}

impl Customizer {
    fn mark_textarea(&mut self, path: &SchemaPath, node: &Map<String, Value>) {
        let long = node
            .get("maxLength")
            .and_then(Value::as_u64)
            .is_some_and(|len| len > TEXTAREA_MIN_LENGTH);
        let text = node
            .get("contentMediaType")
            .and_then(Value::as_str)
            .is_some_and(|media| media.starts_with("text/"));
        if (long || text)
            && !ui::set(
                &mut self.ui_schema,
                path,
                UI_WIDGET,
                Value::String(UI_WIDGET_TEXTAREA.to_string()),
            )
        {
            debug!("cannot set textarea widget at {path}: UI hints are not an object there");
        }
    }

    fn directive(&self, path: &SchemaPath) -> Option<Directive> {
        ui::find(&self.ui_schema, path)?
            .get(&self.directive_key)
            .and_then(Directive::parse)
    }

    fn release_required(&mut self, path: &SchemaPath) {
        if let (Some(name), Some(frame)) = (path.last(), self.owners.last_mut()) {
            frame.push(name.to_string());
        }
    }
}

impl SchemaProcessor for Customizer {
    fn process(
        &mut self,
        path: &SchemaPath,
        node: &mut Map<String, Value>,
        kind: NodeKind,
    ) -> Visit {
        self.mark_textarea(path, node);

        let visit = match self.directive(path) {
            Some(Directive::Hidden) if path.is_root() => {
                debug!("ignoring {} = hidden on the schema root", self.directive_key);
                Visit::Keep
            }
            Some(Directive::Hidden) => {
                self.release_required(path);
                Visit::Remove
            }
            Some(Directive::Disabled) => {
                node.insert(KEY_READ_ONLY.to_string(), Value::Bool(true));
                self.release_required(path);
                Visit::Keep
            }
            None => Visit::Keep,
        };

        // Opened after the node's own directive so that a hidden object
        // releases its name from the parent, not from itself.
        if kind == NodeKind::Object && visit == Visit::Keep {
            self.owners.push(Vec::new());
        }
        visit
    }

    fn leave_object(&mut self, _path: &SchemaPath, node: &mut Map<String, Value>) {
        let Some(released) = self.owners.pop() else {
            return;
        };
        if released.is_empty() {
            return;
        }
        if let Some(Value::Array(required)) = node.get_mut(KEY_REQUIRED) {
            required.retain(|name| !name.as_str().is_some_and(|n| released.iter().any(|r| r == n)));
        }
    }
}
