//! Schema node model shared by every transformation.
//!
//! Schemas stay plain [`serde_json::Value`] trees so that keywords the engine
//! does not know about survive every pass untouched. What the engine needs to
//! know about a node is decided once per visit by [`classify`], which maps the
//! ad hoc `type`/`properties` fields onto the closed [`Body`] variant.
//!
//! - [`path`] - node addressing shared by schemas and UI hints
//! - [`pointer`] - `$ref` splitting and `#/definitions/...` lookup
//! - [`ui`] - UI-hints lookup and directive names

use std::fmt;

use serde_json::{Map, Value};

use crate::error::SchemaError;

pub mod path;
pub mod pointer;
pub mod ui;

pub use path::SchemaPath;

/// Canonical draft-07 meta-schema URI.
pub const DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";

/// Meta-schema URI of a document.
pub const KEY_SCHEMA: &str = "$schema";
/// Reference to another schema, local (`#/...`) or remote.
pub const KEY_REF: &str = "$ref";
/// Primitive type name, or a list of them for a union.
pub const KEY_TYPE: &str = "type";
/// Display title; also labels a tab.
pub const KEY_TITLE: &str = "title";
/// Named child schemas of an object.
pub const KEY_PROPERTIES: &str = "properties";
/// Item schema of an array, or a list of them for a tuple.
pub const KEY_ITEMS: &str = "items";
/// Names of the properties an object must have.
pub const KEY_REQUIRED: &str = "required";
/// Set on a node whose value may not be edited.
pub const KEY_READ_ONLY: &str = "readOnly";
/// Shared schemas addressed by `#/definitions/<name>`.
pub const KEY_DEFINITIONS: &str = "definitions";
/// Property dependencies: a schema or a list of required names per property.
pub const KEY_DEPENDENCIES: &str = "dependencies";
/// Allowed values of a node.
pub const KEY_ENUM: &str = "enum";

/// Composition keywords, in the order they are walked.
pub const COMPOSITION_KEYWORDS: &[&str] = &["allOf", "anyOf", "oneOf"];

/// Draft-07 primitive types that carry no child schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

impl ScalarType {
    /// Parse a `type` keyword value. `object` and `array` are not scalars.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "string" => Self::String,
            "number" => Self::Number,
            "integer" => Self::Integer,
            "boolean" => Self::Boolean,
            "null" => Self::Null,
            _ => return None,
        })
    }

    /// The `type` keyword value of this scalar.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Null => "null",
        }
    }
}

/// The kind a processor is invoked with for one visit of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// The node is a `$ref` forwarding reference.
    Ref,
    /// The node has `properties` (or declares `type: "object"`).
    Object,
    /// The node declares `type: "array"`.
    Array,
    /// The node declares a primitive `type`.
    Scalar(ScalarType),
}

impl NodeKind {
    /// The name the processor sees for this kind, e.g. `"$ref"` or
    /// `"integer"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ref => "$ref",
            Self::Object => "object",
            Self::Array => "array",
            Self::Scalar(t) => t.as_str(),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural shape of a node's body, ignoring any `$ref` it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Body {
    Object,
    Array,
    Scalar(ScalarType),
    /// No `type` and no `properties`: a pure reference, composition or enum.
    Untyped,
}

/// Classify a schema node.
///
/// `properties` wins over `type`, so an object schema that forgot its
/// `type` is still walked as an object.
pub fn classify(node: &Map<String, Value>, path: &SchemaPath) -> Result<Body, SchemaError> {
    if node.contains_key(KEY_PROPERTIES) {
        return Ok(Body::Object);
    }
    match node.get(KEY_TYPE) {
        None => Ok(Body::Untyped),
        Some(Value::String(name)) => match name.as_str() {
            "object" => Ok(Body::Object),
            "array" => Ok(Body::Array),
            other => ScalarType::from_name(other)
                .map(Body::Scalar)
                .ok_or_else(|| SchemaError::UnknownType {
                    path: path.to_string(),
                    type_name: other.to_string(),
                }),
        },
        Some(Value::Array(types)) => Err(SchemaError::UnionType {
            path: path.to_string(),
            types: Value::Array(types.clone()).to_string(),
        }),
        Some(other) => Err(SchemaError::UnknownType {
            path: path.to_string(),
            type_name: other.to_string(),
        }),
    }
}

/// The `$ref` string of a node, if it has one.
pub fn ref_of(node: &Map<String, Value>) -> Option<&str> {
    node.get(KEY_REF).and_then(Value::as_str)
}

/// The `title` of a node, if it is a string.
pub fn title_of(node: &Map<String, Value>) -> Option<&str> {
    node.get(KEY_TITLE).and_then(Value::as_str)
}
