//! Remote Schema Inliner.
//!
//! Turns a schema spread over several documents into one self-contained
//! schema. Every external `$ref` is fetched once, stored under
//! `definitions/<name>` where `<name>` is the document URL with every run of
//! non-alphanumeric characters replaced by `_`, and rewritten to point there.
//! References local to a fetched document are prefixed with that document's
//! definition so they keep pointing into it.
//!
//! Documents are fetched one after the other. The definition cache lives in
//! one [`inline_all_refs`] call and is never shared.

use std::sync::LazyLock;

use futures::future::{BoxFuture, FutureExt};
use log::debug;
use regex::Regex;
use serde_json::{Map, Value};

use crate::{
    error::InlineError,
    schema::{
        COMPOSITION_KEYWORDS, KEY_DEFINITIONS, KEY_DEPENDENCIES, KEY_ITEMS, KEY_PROPERTIES,
        KEY_REF, pointer::split_ref, ref_of,
    },
};

pub mod fetch;

#[cfg(feature = "http")]
pub use fetch::HttpFetcher;
pub use fetch::{FetchOptions, MemoryFetcher, SchemaFetcher, UrlRewrite};

pub type Result<T> = std::result::Result<T, InlineError>;

static NON_IDENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("[^a-zA-Z0-9_]+").expect("static pattern is valid")
});

/// Definition name under which the document at `url` is inlined.
pub fn definition_name(url: &str) -> String {
    NON_IDENT.replace_all(url, "_").into_owned()
}

/// Local reference to `anchor` inside the inlined definition `name`.
pub fn definition_ref(name: &str, anchor: &str) -> String {
    if anchor.is_empty() || anchor.starts_with('/') {
        format!("#/{KEY_DEFINITIONS}/{name}{anchor}")
    } else {
        format!("#/{KEY_DEFINITIONS}/{name}/{anchor}")
    }
}

/// Fetch the schema `reference` points at and inline all of its references.
///
/// `reference` is `<url>#<pointer>`. With a non-empty pointer, the node it
/// points at becomes the root and carries the merged `definitions` in place
/// of its own. Without any fragment, the document must have top-level
/// `properties` to be usable as a form root.
///
/// # Errors
///
/// [`InlineError::AnchorNotFound`] for a dangling pointer,
/// [`InlineError::AmbiguousRoot`] for a fragment-less reference to a document
/// without properties, and any fetch error.
pub async fn read_remote_schema<F>(fetcher: &F, reference: &str) -> Result<Value>
where
    F: SchemaFetcher + ?Sized,
{
    let (url, fragment) = split_ref(reference);
    if url.is_empty() {
        return Err(InlineError::UnsupportedRef {
            reference: reference.to_string(),
        });
    }

    let document = fetch_document(fetcher, url).await?;
    let inlined = inline_all_refs(fetcher, &document).await?;
    debug!("inlined full schema from {url}");

    match fragment.map(str::trim) {
        Some(anchor) if !anchor.is_empty() => {
            let pointer = if anchor.starts_with('/') {
                anchor.to_string()
            } else {
                format!("/{anchor}")
            };
            let Some(Value::Object(node)) = inlined.pointer(&pointer) else {
                return Err(InlineError::AnchorNotFound {
                    anchor: anchor.to_string(),
                    url: url.to_string(),
                });
            };
            // All definitions live on the top level now; keeping the node's
            // own copy would nest them twice.
            let mut root = node.clone();
            root.retain(|key, _| key != KEY_DEFINITIONS);
            if let Some(definitions) = inlined.get(KEY_DEFINITIONS) {
                root.insert(KEY_DEFINITIONS.to_string(), definitions.clone());
            }
            Ok(Value::Object(root))
        }
        Some(_) => Ok(inlined),
        None if inlined.get(KEY_PROPERTIES).is_some() => Ok(inlined),
        None => Err(InlineError::AmbiguousRoot {
            url: url.to_string(),
        }),
    }
}

/// Inline every external reference of `schema` into its `definitions`.
///
/// Returns a new document; `schema` is left untouched. The result always has
/// a `definitions` object.
///
/// # Errors
///
/// Fetch errors and unsupported (relative) references.
pub async fn inline_all_refs<F>(fetcher: &F, schema: &Value) -> Result<Value>
where
    F: SchemaFetcher + ?Sized,
{
    let mut document = schema.clone();
    let Some(root) = document.as_object_mut() else {
        return Ok(document);
    };

    let mut inliner = Inliner {
        fetcher,
        definitions: match root.get_mut(KEY_DEFINITIONS) {
            Some(Value::Object(definitions)) => std::mem::take(definitions),
            _ => Map::new(),
        },
    };

    let local: Vec<String> = inliner.definitions.keys().cloned().collect();
    for name in local {
        let Some(mut definition) = inliner.definitions.get_mut(&name).map(std::mem::take) else {
            continue;
        };
        if let Value::Object(node) = &mut definition {
            inliner.inline_node(node, "").await?;
        }
        inliner.definitions.insert(name, definition);
    }
    if let Some(Value::Object(properties)) = root.get_mut(KEY_PROPERTIES) {
        for property in properties.values_mut() {
            if let Value::Object(node) = property {
                inliner.inline_node(node, "").await?;
            }
        }
    }

    root.insert(
        KEY_DEFINITIONS.to_string(),
        Value::Object(inliner.definitions),
    );
    Ok(document)
}

async fn fetch_document<F>(fetcher: &F, url: &str) -> Result<Value>
where
    F: SchemaFetcher + ?Sized,
{
    let mut document = fetcher.fetch(url).await?;
    fetch::normalize_meta_schema(&mut document);
    Ok(document)
}

struct Inliner<'f, F: ?Sized> {
    fetcher: &'f F,
    /// Merged definitions; also the cache of fetched documents.
    definitions: Map<String, Value>,
}

impl<F: SchemaFetcher + ?Sized> Inliner<'_, F> {
    /// Inline the references below and at `node`. `scope` is the definition
    /// name of the document `node` came from, empty for the root document.
    fn inline_node<'a>(
        &'a mut self,
        node: &'a mut Map<String, Value>,
        scope: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            if let Some(Value::Object(properties)) = node.get_mut(KEY_PROPERTIES) {
                for child in properties.values_mut() {
                    if let Value::Object(child) = child {
                        self.inline_node(child, scope).await?;
                    }
                }
            }
            match node.get_mut(KEY_ITEMS) {
                Some(Value::Object(item)) => self.inline_node(item, scope).await?,
                Some(Value::Array(items)) => {
                    for item in items.iter_mut() {
                        if let Value::Object(item) = item {
                            self.inline_node(item, scope).await?;
                        }
                    }
                }
                _ => {}
            }
            for keyword in COMPOSITION_KEYWORDS {
                if let Some(Value::Array(entries)) = node.get_mut(*keyword) {
                    for entry in entries.iter_mut() {
                        if let Value::Object(entry) = entry {
                            self.inline_node(entry, scope).await?;
                        }
                    }
                }
            }
            if let Some(Value::Object(dependencies)) = node.get_mut(KEY_DEPENDENCIES) {
                for dependency in dependencies.values_mut() {
                    if let Value::Object(dependency) = dependency {
                        self.inline_node(dependency, scope).await?;
                    }
                }
            }

            if let Some(reference) = ref_of(node).map(str::to_owned)
                && let Some(rewritten) = self.rewrite_ref(&reference, scope).await?
            {
                node.insert(KEY_REF.to_string(), Value::String(rewritten));
            }
            Ok(())
        }
        .boxed()
    }

    /// The local form of `reference`, fetching its document if needed.
    /// `None` keeps the reference as it is.
    async fn rewrite_ref(&mut self, reference: &str, scope: &str) -> Result<Option<String>> {
        let (url, fragment) = split_ref(reference);
        if url.starts_with("http://") || url.starts_with("https://") {
            let name = definition_name(url);
            if !self.definitions.contains_key(&name) {
                self.inline_remote(url, &name, scope).await?;
            }
            return Ok(Some(definition_ref(&name, fragment.unwrap_or(""))));
        }
        if !url.is_empty() {
            return Err(InlineError::UnsupportedRef {
                reference: reference.to_string(),
            });
        }
        match fragment {
            Some(fragment) if !scope.is_empty() => Ok(Some(definition_ref(scope, fragment))),
            _ => Ok(None),
        }
    }

    fn inline_remote<'a>(
        &'a mut self,
        url: &'a str,
        name: &'a str,
        scope: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            debug!("fetching and inlining schema definitions {name} (from scope {scope:?})");
            // Claim the name before recursing so cyclic references stop here.
            self.definitions.insert(name.to_string(), Value::Bool(true));

            let mut document = fetch_document(self.fetcher, url).await?;
            if let Value::Object(root) = &mut document {
                if let Some(Value::Object(definitions)) = root.get_mut(KEY_DEFINITIONS) {
                    for definition in definitions.values_mut() {
                        if let Value::Object(definition) = definition {
                            self.inline_node(definition, name).await?;
                        }
                    }
                }
                self.inline_node(root, name).await?;
            }
            self.definitions.insert(name.to_string(), document);
            Ok(())
        }
        .boxed()
    }
}
