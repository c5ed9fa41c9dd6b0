//! Java `.properties` text, read with the `java-properties` crate.
//!
//! A key given twice keeps the last value. Keys are kept sorted so that a
//! nested object can be found by key prefix.

use std::collections::BTreeMap;

use crate::error::PropertiesError;

/// Flat `key -> value` mapping read from `.properties` text.
pub type FlatProperties = BTreeMap<String, String>;

/// Read `.properties` text into a sorted flat mapping.
pub fn parse(text: &str) -> Result<FlatProperties, PropertiesError> {
    Ok(java_properties::read(text.as_bytes())?.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escaped_key_and_sorted_keys() {
        let props = parse("b=2\na\\ b=x=y\n").unwrap();
        assert_eq!(props.get("a b").map(String::as_str), Some("x=y"));
        let keys: Vec<&str> = props.keys().map(String::as_str).collect();
        assert_eq!(keys, ["a b", "b"]);
    }

    #[test]
    fn test_comments_only() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("# only comments\n! more\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_escape_is_an_error() {
        let err = parse("ok=1\nbad=\\uzzzz\n").unwrap_err();
        assert!(matches!(err, PropertiesError::Read(_)));
    }
}
