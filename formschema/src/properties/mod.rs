//! Properties codec.
//!
//! Converts form data to flat `.properties` text and back. Encoding needs
//! only the data: nested keys are joined with `.`, array elements use their
//! zero-based index. Decoding needs the schema the data was entered against,
//! because the text alone does not say which values are numbers, booleans,
//! objects or arrays.
//!
//! Decoding is best effort. Values that do not fit their schema, and schema
//! shapes the codec cannot follow, are logged and left out of the result.

use std::{cell::RefCell, ops::Bound};

use log::{error, warn};
use serde_json::{Map, Number, Value};

use crate::{
    error::PropertiesError,
    schema::{
        COMPOSITION_KEYWORDS, KEY_DEPENDENCIES, KEY_ENUM, KEY_ITEMS, KEY_PROPERTIES, KEY_TYPE,
        pointer::resolve_local, ref_of,
    },
};

pub mod text;

pub use text::FlatProperties;

/// Parse `.properties` text into data shaped by `schema`.
///
/// # Errors
///
/// Only malformed text fails; see [`text::parse`].
pub fn parse_properties_by_schema(
    properties: &str,
    schema: &Value,
) -> Result<Map<String, Value>, PropertiesError> {
    let flat = text::parse(properties)?;
    Ok(extract_object_by_schema(&flat, schema, ""))
}

/// Rebuild the object described by `schema` from flat properties whose keys
/// start with `prefix`.
///
/// `$ref`s are resolved against `schema` itself, so it should be the whole
/// document. No properties at all give an empty object.
pub fn extract_object_by_schema(
    flat: &FlatProperties,
    schema: &Value,
    prefix: &str,
) -> Map<String, Value> {
    let mut object = Map::new();
    if flat.is_empty() {
        return object;
    }
    if let Some(node) = schema.as_object() {
        let extractor = Extractor {
            flat,
            root: schema,
            resolving: RefCell::new(Vec::new()),
        };
        extractor.extract_into(node, prefix, &mut object);
    }
    object
}

struct Extractor<'a> {
    flat: &'a FlatProperties,
    root: &'a Value,
    /// `(key, $ref)` pairs being resolved on the current descent.
    resolving: RefCell<Vec<(String, String)>>,
}

impl Extractor<'_> {
    fn extract_into(&self, node: &Map<String, Value>, prefix: &str, object: &mut Map<String, Value>) {
        if let Some(Value::Object(properties)) = node.get(KEY_PROPERTIES) {
            self.extract_properties(properties, prefix, object);
        }
        for keyword in COMPOSITION_KEYWORDS {
            if let Some(Value::Array(entries)) = node.get(*keyword) {
                for entry in entries {
                    if let Some(Value::Object(properties)) = entry.get(KEY_PROPERTIES) {
                        self.extract_properties(properties, prefix, object);
                    }
                }
            }
        }
        if let Some(Value::Object(dependencies)) = node.get(KEY_DEPENDENCIES) {
            for dependency in dependencies.values() {
                // Required-name lists carry no fields.
                if let Value::Object(dependency) = dependency {
                    self.extract_into(dependency, prefix, object);
                }
            }
        }
    }

    fn extract_properties(
        &self,
        properties: &Map<String, Value>,
        prefix: &str,
        object: &mut Map<String, Value>,
    ) {
        for (name, prop) in properties {
            let Value::Object(prop) = prop else {
                continue;
            };
            if let Some(value) = self.extract_property(&format!("{prefix}{name}"), prop) {
                object.insert(name.clone(), value);
            }
        }
    }

    fn extract_property(&self, key: &str, prop: &Map<String, Value>) -> Option<Value> {
        match prop.get(KEY_TYPE).and_then(Value::as_str) {
            Some("number" | "integer") => self.raw(key).and_then(|raw| parse_number(key, raw)),
            Some("string") => self.raw(key).map(|raw| Value::String(raw.to_string())),
            Some("boolean") => self.raw(key).map(|raw| Value::Bool(raw == "true")),
            Some("object") => self.extract_object(key, prop),
            None if prop.contains_key(KEY_PROPERTIES) => self.extract_object(key, prop),
            Some("array") => self.extract_array(key, prop),
            _ => {
                if let Some(reference) = ref_of(prop) {
                    self.extract_ref(key, reference)
                } else if !prop.contains_key(KEY_ENUM) {
                    // A bare enum only selects a dependency branch.
                    error!("unsupported schema for property {key}: {}", Value::Object(prop.clone()));
                    None
                } else {
                    None
                }
            }
        }
    }

    fn extract_object(&self, key: &str, node: &Map<String, Value>) -> Option<Value> {
        let prefix = format!("{key}.");
        if !self.has_prefix(&prefix) {
            return None;
        }
        let mut object = Map::new();
        self.extract_into(node, &prefix, &mut object);
        (!object.is_empty()).then_some(Value::Object(object))
    }

    fn extract_array(&self, key: &str, prop: &Map<String, Value>) -> Option<Value> {
        match prop.get(KEY_ITEMS) {
            Some(Value::Object(items)) => {
                // Indices are dense from zero; the first gap ends the array.
                let values: Vec<Value> = (0..)
                    .map_while(|index| self.extract_property(&format!("{key}.{index}"), items))
                    .collect();
                (!values.is_empty()).then_some(Value::Array(values))
            }
            Some(Value::Array(_)) => {
                error!("unsupported array with multiple item schemas at {key}");
                None
            }
            _ => None,
        }
    }

    fn extract_ref(&self, key: &str, reference: &str) -> Option<Value> {
        if !reference.starts_with('#') {
            error!("unsupported $ref {reference} at {key}");
            return None;
        }
        match resolve_local(self.root, reference) {
            Some(Value::Object(target)) => {
                // A ref is followed at most once per key on one descent.
                let site = (key.to_string(), reference.to_string());
                if self.resolving.borrow().contains(&site) {
                    error!("recursive $ref {reference} at {key}");
                    return None;
                }
                self.resolving.borrow_mut().push(site);
                let value = self.extract_property(key, target);
                self.resolving.borrow_mut().pop();
                value
            }
            _ => {
                error!("cannot resolve $ref {reference} at {key}");
                None
            }
        }
    }

    /// The value stored under `key`, unless missing or empty.
    fn raw(&self, key: &str) -> Option<&str> {
        self.flat
            .get(key)
            .map(String::as_str)
            .filter(|raw| !raw.is_empty())
    }

    fn has_prefix(&self, prefix: &str) -> bool {
        self.flat
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .next()
            .is_some_and(|(key, _)| key.starts_with(prefix))
    }
}

fn parse_number(key: &str, raw: &str) -> Option<Value> {
    let raw = raw.trim();
    if let Ok(int) = raw.parse::<i64>() {
        return Some(Value::from(int));
    }
    match raw.parse::<f64>().ok().and_then(Number::from_f64) {
        Some(number) => Some(Value::Number(number)),
        None => {
            warn!("ignoring non-numeric value {raw:?} for {key}");
            None
        }
    }
}

/// Serialize `data` as `.properties` text, one `key=value` line per scalar.
///
/// Keys are prefixed with `namespace.` when given. `null` values produce no
/// line.
pub fn object_to_properties(data: &Map<String, Value>, namespace: Option<&str>) -> String {
    let mut output = String::new();
    for (key, value) in data {
        write_entry(&mut output, namespace, key, value);
    }
    output
}

fn write_entry(output: &mut String, namespace: Option<&str>, key: &str, value: &Value) {
    let nested = || match namespace {
        Some(ns) if !ns.is_empty() => format!("{ns}.{key}"),
        _ => key.to_string(),
    };
    match value {
        Value::Null => {}
        Value::Object(fields) => {
            let ns = nested();
            for (k, v) in fields {
                write_entry(output, Some(&ns), k, v);
            }
        }
        Value::Array(items) => {
            let ns = nested();
            for (index, v) in items.iter().enumerate() {
                write_entry(output, Some(&ns), &index.to_string(), v);
            }
        }
        Value::String(s) => write_line(output, namespace, key, &escape_value(s)),
        Value::Number(n) => write_line(output, namespace, key, &format_number(n)),
        Value::Bool(b) => write_line(output, namespace, key, if *b { "true" } else { "false" }),
    }
}

fn write_line(output: &mut String, namespace: Option<&str>, key: &str, value: &str) {
    if let Some(ns) = namespace.filter(|ns| !ns.is_empty()) {
        output.push_str(&escape_key(ns));
        if !key.is_empty() {
            output.push('.');
        }
    }
    output.push_str(&escape_key(key));
    output.push('=');
    output.push_str(value);
    output.push('\n');
}

/// `42` rather than `42.0` for integral values. Other floats use Rust's
/// plain decimal form, never an exponent: `1e21` prints all its digits.
fn format_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else {
        n.as_f64().map(|f| f.to_string()).unwrap_or_else(|| n.to_string())
    }
}

fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            '=' => out.push_str("\\="),
            ':' => out.push_str("\\:"),
            ' ' => out.push_str("\\ "),
            c => push_escaped(&mut out, c),
        }
    }
    out
}

fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        push_escaped(&mut out, c);
    }
    out
}

fn push_escaped(out: &mut String, c: char) {
    match c {
        '\\' => out.push_str("\\\\"),
        '\x0c' => out.push_str("\\f"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        c => out.push(c),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn scalars_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "n": {"type": "number"},
                "s": {"type": "string"},
                "b": {"type": "boolean"}
            }
        })
    }

    #[test]
    fn test_scalars_round_trip() {
        let text = "n=42\ns=hello\nb=true\n";
        let data = parse_properties_by_schema(text, &scalars_schema()).unwrap();
        assert_eq!(Value::Object(data.clone()), json!({"n": 42, "s": "hello", "b": true}));

        let encoded = object_to_properties(&data, None);
        assert_eq!(text::parse(&encoded).unwrap(), text::parse(text).unwrap());
    }

    #[test]
    fn test_empty_text_gives_empty_object() {
        assert!(parse_properties_by_schema("", &scalars_schema()).unwrap().is_empty());
        assert!(parse_properties_by_schema("", &json!({"$ref": "#/nope"})).unwrap().is_empty());
        assert!(parse_properties_by_schema("# nothing\n", &json!(true)).unwrap().is_empty());
    }

    #[test]
    fn test_key_escaping() {
        let encoded = object_to_properties(&object(json!({"a b": "x=y"})), None);
        assert_eq!(encoded, "a\\ b=x=y\n");
        let flat = text::parse(&encoded).unwrap();
        assert_eq!(flat.get("a b").map(String::as_str), Some("x=y"));

        let encoded = object_to_properties(&object(json!({"k:=": "a\\b\tc\nd"})), None);
        assert_eq!(encoded, "k\\:\\==a\\\\b\\tc\\nd\n");
        let flat = text::parse(&encoded).unwrap();
        assert_eq!(flat.get("k:=").map(String::as_str), Some("a\\b\tc\nd"));
    }

    #[test]
    fn test_encode_nested_and_namespace() {
        let data = object(json!({
            "server": {"host": "h", "port": 8080, "tls": false},
            "ratio": 0.5,
            "whole": 3.0,
            "tags": ["a", "b"],
            "none": null
        }));
        assert_eq!(
            object_to_properties(&data, Some("app")),
            "app.server.host=h\napp.server.port=8080\napp.server.tls=false\napp.ratio=0.5\napp.whole=3\napp.tags.0=a\napp.tags.1=b\n"
        );
    }

    #[test]
    fn test_large_and_small_floats_print_as_decimals() {
        let data = object(json!({"big": 1e21, "tiny": 1e-7}));
        let encoded = object_to_properties(&data, None);
        assert_eq!(encoded, "big=1000000000000000000000\ntiny=0.0000001\n");

        let schema = json!({"type": "object", "properties": {"big": {"type": "number"}, "tiny": {"type": "number"}}});
        let decoded = parse_properties_by_schema(&encoded, &schema).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_decode_nested_arrays_and_refs() {
        let schema = json!({
            "type": "object",
            "definitions": {
                "Endpoint": {"type": "object", "properties": {"url": {"type": "string"}, "retries": {"type": "integer"}}},
                "Level": {"type": "string"}
            },
            "properties": {
                "primary": {"$ref": "#/definitions/Endpoint"},
                "level": {"$ref": "#/definitions/Level"},
                "mirrors": {"type": "array", "items": {"$ref": "#/definitions/Endpoint"}},
                "ports": {"type": "array", "items": {"type": "integer"}},
                "unused": {"type": "object", "properties": {"x": {"type": "string"}}}
            }
        });
        let text = "\
primary.url=https://a
primary.retries=3
level=debug
mirrors.0.url=https://b
mirrors.1.url=https://c
mirrors.1.retries=1
ports.0=80
ports.1=443
ports.3=8443
";
        let data = parse_properties_by_schema(text, &schema).unwrap();
        assert_eq!(
            Value::Object(data),
            json!({
                "primary": {"url": "https://a", "retries": 3},
                "level": "debug",
                "mirrors": [{"url": "https://b"}, {"url": "https://c", "retries": 1}],
                "ports": [80, 443]
            })
        );
    }

    #[test]
    fn test_decode_compositions_and_dependencies() {
        let schema = json!({
            "type": "object",
            "properties": {"kind": {"enum": ["file", "net"]}},
            "allOf": [{"properties": {"name": {"type": "string"}}}],
            "dependencies": {
                "kind": {
                    "oneOf": [
                        {"properties": {"kind": {"enum": ["file"]}, "path": {"type": "string"}}},
                        {"properties": {"kind": {"enum": ["net"]}, "port": {"type": "number"}}}
                    ]
                },
                "name": ["kind"]
            }
        });
        let data = parse_properties_by_schema("kind=net\nname=n\nport=1.5\n", &schema).unwrap();
        assert_eq!(Value::Object(data), json!({"name": "n", "port": 1.5}));
    }

    #[test]
    fn test_decode_skips_bad_values() {
        let _ = env_logger::builder().is_test(true).try_init();
        let schema = json!({
            "type": "object",
            "properties": {
                "n": {"type": "number"},
                "empty": {"type": "string"},
                "flag": {"type": "boolean"},
                "tuple": {"type": "array", "items": [{"type": "string"}]},
                "remote": {"$ref": "https://h/a.json#/definitions/X"},
                "missing": {"$ref": "#/definitions/Missing"}
            }
        });
        let text = "n=abc\nempty=\nflag=yes\ntuple.0=a\nremote=r\nmissing=m\n";
        let data = parse_properties_by_schema(text, &schema).unwrap();
        assert_eq!(Value::Object(data), json!({"flag": false}));
    }

    #[test]
    #[ntest::timeout(1000)]
    fn test_recursive_schema_terminates() {
        let schema = json!({
            "definitions": {
                "Node": {"type": "object", "properties": {"name": {"type": "string"}, "child": {"$ref": "#/definitions/Node"}}}
            },
            "type": "object",
            "properties": {"root": {"$ref": "#/definitions/Node"}}
        });
        let data = parse_properties_by_schema("root.name=a\nroot.child.name=b\n", &schema).unwrap();
        assert_eq!(Value::Object(data), json!({"root": {"name": "a", "child": {"name": "b"}}}));
    }

    #[test]
    #[ntest::timeout(1000)]
    fn test_alias_ref_cycle_is_skipped() {
        let _ = env_logger::builder().is_test(true).try_init();
        let schema = json!({
            "definitions": {
                "A": {"$ref": "#/definitions/B"},
                "B": {"$ref": "#/definitions/A"}
            },
            "type": "object",
            "properties": {"a": {"$ref": "#/definitions/A"}, "n": {"type": "number"}}
        });
        let data = parse_properties_by_schema("a=1\nn=2\n", &schema).unwrap();
        assert_eq!(Value::Object(data), json!({"n": 2}));
    }

    #[test]
    fn test_extract_with_prefix() {
        let flat = text::parse("app.n=1\napp.s=x\nother=2\n").unwrap();
        let data = extract_object_by_schema(&flat, &scalars_schema(), "app.");
        assert_eq!(Value::Object(data), json!({"n": 1, "s": "x"}));
    }
}
