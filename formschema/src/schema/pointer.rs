//! `$ref` parsing and JSON Pointer helpers (RFC 6901).

use std::borrow::Cow;

use serde_json::{Map, Value};

const DEFINITIONS_POINTER: &str = "/definitions/";

/// Split a reference into its document part and its fragment.
///
/// `"https://host/a.json#/definitions/X"` gives `("https://host/a.json", Some("/definitions/X"))`,
/// `"#/definitions/X"` gives `("", Some("/definitions/X"))`.
pub fn split_ref(reference: &str) -> (&str, Option<&str>) {
    match reference.split_once('#') {
        Some((doc, fragment)) => (doc, Some(fragment)),
        None => (reference, None),
    }
}

/// Decode a single pointer segment: `~1` becomes `/`, then `~0` becomes `~`.
pub fn unescape_segment(segment: &str) -> Cow<'_, str> {
    if segment.contains("~0") || segment.contains("~1") {
        Cow::Owned(segment.replace("~1", "/").replace("~0", "~"))
    } else {
        Cow::Borrowed(segment)
    }
}

/// A same-document reference into `definitions`: the entry name and the
/// pointer to the target inside that entry (empty for the entry itself).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionRef {
    pub name: String,
    pub rest: String,
}

impl DefinitionRef {
    /// Parse `#/definitions/<name><rest>`. Anything else yields `None`.
    pub fn parse(reference: &str) -> Option<Self> {
        let (doc, fragment) = split_ref(reference);
        if !doc.is_empty() {
            return None;
        }
        let tail = fragment?.strip_prefix(DEFINITIONS_POINTER)?;
        let (name, rest) = match tail.find('/') {
            Some(idx) => (&tail[..idx], &tail[idx..]),
            None => (tail, ""),
        };
        Some(Self {
            name: unescape_segment(name).into_owned(),
            rest: rest.to_string(),
        })
    }

    /// Whether `other` points at this target or somewhere inside it.
    pub fn encloses(&self, other: &DefinitionRef) -> bool {
        self.name == other.name
            && (other.rest == self.rest || other.rest.starts_with(&format!("{}/", self.rest)))
    }

    /// The target inside `definitions`, if the entry and pointer exist.
    pub fn resolve_mut<'a>(
        &self,
        definitions: &'a mut Map<String, Value>,
    ) -> Option<&'a mut Value> {
        definitions.get_mut(&self.name)?.pointer_mut(&self.rest)
    }
}

/// Resolve a same-document reference (`#<pointer>`) against a root document.
///
/// Returns `None` for references into other documents or missing targets.
pub fn resolve_local<'a>(root: &'a Value, reference: &str) -> Option<&'a Value> {
    match split_ref(reference) {
        ("", Some(fragment)) => root.pointer(fragment),
        _ => None,
    }
}
