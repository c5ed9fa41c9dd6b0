//! # formschema
//!
//! JSON Schema transformation engine for schema-driven forms.
//!
//! formschema takes a JSON Schema (draft-07) together with an optional
//! UI-hints tree and produces the structures a form renderer needs. It never
//! renders anything itself: every operation is a transformation over plain
//! [`serde_json::Value`] trees.
//!
//! ## Features
//!
//! - Generic schema walker with in-place rewrite and removal of nodes
//! - Edit-mode customization (`ui:create`, `ui:update`, `ui:view` directives)
//! - Splitting of top-level properties into tabs (`ui:layout: tab`)
//! - Inlining of remote `$ref`s into a single self-contained schema
//! - Conversion of form data to and from Java `.properties` text
//!
//! ## Quick Start
//!
//! ```rust
//! use formschema::{CustomizeSchemas, EditMode, customize_schemas, split_schema};
//! use serde_json::json;
//!
//! let input = CustomizeSchemas {
//!     schema: json!({
//!         "type": "object",
//!         "required": ["id", "name"],
//!         "properties": {
//!             "id": {"type": "string"},
//!             "name": {"type": "string"},
//!             "settings": {"type": "object", "properties": {}}
//!         }
//!     }),
//!     ui_schema: json!({
//!         "id": {"ui:update": "hidden"},
//!         "settings": {"ui:layout": "tab"}
//!     }),
//!     edit_mode: EditMode::Update,
//! };
//!
//! let customized = customize_schemas(&input).unwrap();
//! assert_eq!(customized.schema["required"], json!(["name"]));
//!
//! let tabs = split_schema(&customized.schema, Some(&customized.ui_schema));
//! assert_eq!(tabs.len(), 2);
//! ```
//!
//! ## Modules
//!
//! - [`schema`] - Node classification, paths, `$ref` pointers and UI hints
//! - [`walker`] - Recursive schema traversal and rewrite
//! - [`customizer`] - Edit-mode visibility and widget rules
//! - [`splitter`] - Tab partitioning of top-level properties
//! - [`tabs`] - Data and error state of a tabbed form
//! - [`inliner`] - Remote `$ref` inlining (async)
//! - [`properties`] - `.properties` text codec

/// Error types of every transformation.
pub mod error;

/// Schema node model shared by every transformation.
pub mod schema;

/// Recursive schema traversal.
///
/// Visits every node of a schema depth first and lets a processor rewrite or
/// remove it. `$ref`s are followed into `definitions`.
pub mod walker;

pub mod customizer;
pub mod inliner;
pub mod properties;
pub mod splitter;
pub mod tabs;

pub use customizer::{CustomizeSchemas, EditMode, customize_schemas};
pub use error::{InlineError, PropertiesError, SchemaError};
pub use inliner::{SchemaFetcher, inline_all_refs, read_remote_schema};
pub use properties::{extract_object_by_schema, object_to_properties, parse_properties_by_schema};
pub use schema::{NodeKind, SchemaPath};
pub use serde_json::Value;
pub use splitter::{SubSchema, split_schema};
pub use tabs::{TabbedForm, TabbedFormResult};
pub use walker::{SchemaProcessor, Visit, process_schema};
