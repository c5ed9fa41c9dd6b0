use std::fmt;

/// Location of a node from the document root.
///
/// Segments are property names, `items` for a homogeneous array's item
/// schema, or positional indices for tuple items and composition entries.
/// The same segments address the parallel UI-hints tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SchemaPath(Vec<String>);

impl SchemaPath {
    /// The empty path of the document root.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// A new path with `segment` appended.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Segments from the root down to this node.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The last segment, i.e. the property name for a property node.
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Whether this path has no segments.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether any segment equals `segment`.
    pub fn contains(&self, segment: &str) -> bool {
        self.0.iter().any(|s| s == segment)
    }
}

impl From<Vec<String>> for SchemaPath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        f.write_str(&self.0.join("."))
    }
}
