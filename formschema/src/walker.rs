//! Schema Tree Walker.
//!
//! [`process_schema`] walks a schema depth first and hands every node it
//! visits to a [`SchemaProcessor`], which may edit the node in place or ask
//! for it to be removed from its parent collection.
//!
//! The input is never mutated: the walker works on a copy and returns it.
//! `definitions` act as an arena addressed by name. A `$ref` is resolved by
//! looking its target up in that arena and walking it at the path of the
//! referring node; edits made there are written back to the arena entry, so
//! they show up in the returned document's `definitions`. A definition that
//! is referenced from several places is walked once per reference site.

use log::debug;
use serde_json::{Map, Value};

use crate::{
    error::SchemaError,
    schema::{
        Body, COMPOSITION_KEYWORDS, KEY_DEFINITIONS, KEY_DEPENDENCIES, KEY_ITEMS,
        KEY_PROPERTIES, NodeKind, SchemaPath, classify, pointer::DefinitionRef, ref_of,
    },
};

pub type Result<T> = std::result::Result<T, SchemaError>;

/// What the walker should do with a node after the processor saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Keep the node (possibly modified) and continue into its children.
    Keep,
    /// Drop the node from its parent collection.
    Remove,
}

/// Callback invoked by [`process_schema`] for each visited node.
///
/// Closures can be turned into processors with [`from_fn`].
pub trait SchemaProcessor {
    /// Inspect or edit `node`, visited at `path` as `kind`.
    fn process(
        &mut self,
        path: &SchemaPath,
        node: &mut Map<String, Value>,
        kind: NodeKind,
    ) -> Visit;

    /// Called once an object node's properties and dependencies were walked.
    fn leave_object(&mut self, _path: &SchemaPath, _node: &mut Map<String, Value>) {}
}

/// A processor backed by a closure, see [`from_fn`].
pub struct FnProcessor<F>(F);

/// Wrap a closure as a [`SchemaProcessor`] without a `leave_object` hook.
pub fn from_fn<F>(f: F) -> FnProcessor<F>
where
    F: FnMut(&SchemaPath, &mut Map<String, Value>, NodeKind) -> Visit,
{
    FnProcessor(f)
}

impl<F> SchemaProcessor for FnProcessor<F>
where
    F: FnMut(&SchemaPath, &mut Map<String, Value>, NodeKind) -> Visit,
{
    fn process(
        &mut self,
        path: &SchemaPath,
        node: &mut Map<String, Value>,
        kind: NodeKind,
    ) -> Visit {
        (self.0)(path, node, kind)
    }
}

/// Walk `schema` with `processor` and return the rewritten copy.
///
/// Returns `Ok(None)` if the processor removed the root node.
///
/// # Errors
///
/// Fails on union `type` lists, unknown type names, `$ref`s that are not
/// `#/definitions/...` pointers and `$ref`s whose target does not exist.
pub fn process_schema<P>(schema: &Value, processor: &mut P) -> Result<Option<Value>>
where
    P: SchemaProcessor + ?Sized,
{
    let Value::Object(root) = schema else {
        return Ok(Some(schema.clone()));
    };
    let mut root = root.clone();
    let definitions = match root.get_mut(KEY_DEFINITIONS) {
        Some(Value::Object(defs)) => Some(std::mem::take(defs)),
        _ => None,
    };

    let had_definitions = definitions.is_some();

    let mut walker = Walker {
        definitions: definitions.unwrap_or_default(),
        processor,
        active_refs: Vec::new(),
    };
    let visit = walker.walk(&SchemaPath::root(), &mut root)?;
    if visit == Visit::Remove {
        return Ok(None);
    }

    if had_definitions {
        root.insert(
            KEY_DEFINITIONS.to_string(),
            Value::Object(walker.definitions),
        );
    }
    Ok(Some(Value::Object(root)))
}

struct Walker<'p, P: ?Sized> {
    definitions: Map<String, Value>,
    processor: &'p mut P,
    /// Definition targets currently being walked, outermost first.
    active_refs: Vec<DefinitionRef>,
}

impl<P: SchemaProcessor + ?Sized> Walker<'_, P> {
    fn walk(&mut self, path: &SchemaPath, node: &mut Map<String, Value>) -> Result<Visit> {
        if ref_of(node).is_some() {
            if self.processor.process(path, node, NodeKind::Ref) == Visit::Remove {
                return Ok(Visit::Remove);
            }
            // The processor may have rewritten or dropped the reference.
            if let Some(reference) = ref_of(node).map(str::to_owned) {
                self.follow(path, &reference)?;
            }
        }

        for keyword in COMPOSITION_KEYWORDS {
            if let Some(Value::Array(entries)) = node.get_mut(*keyword) {
                self.walk_sequence(path, entries)?;
            }
        }

        match classify(node, path)? {
            Body::Object => {
                if self.processor.process(path, node, NodeKind::Object) == Visit::Remove {
                    return Ok(Visit::Remove);
                }
                if let Some(Value::Object(properties)) = node.get_mut(KEY_PROPERTIES) {
                    self.walk_map(path, properties)?;
                }
                // Only schema-valued dependencies are walked; property lists
                // are left alone by walk_map.
                if let Some(Value::Object(dependencies)) = node.get_mut(KEY_DEPENDENCIES) {
                    self.walk_map(path, dependencies)?;
                }
                self.processor.leave_object(path, node);
            }
            Body::Array => {
                if self.processor.process(path, node, NodeKind::Array) == Visit::Remove {
                    return Ok(Visit::Remove);
                }
                let mut drop_items = false;
                match node.get_mut(KEY_ITEMS) {
                    Some(Value::Object(item)) => {
                        drop_items = self.walk(&path.child(KEY_ITEMS), item)? == Visit::Remove;
                    }
                    Some(Value::Array(items)) => self.walk_sequence(path, items)?,
                    _ => {}
                }
                if drop_items {
                    node.retain(|key, _| key != KEY_ITEMS);
                }
            }
            Body::Scalar(scalar) => {
                return Ok(self.processor.process(path, node, NodeKind::Scalar(scalar)));
            }
            Body::Untyped => {}
        }
        Ok(Visit::Keep)
    }

    /// Walk the definition a `$ref` points at, at the referring node's path.
    fn follow(&mut self, path: &SchemaPath, reference: &str) -> Result<()> {
        let target = DefinitionRef::parse(reference).ok_or_else(|| SchemaError::UnsupportedRef {
            path: path.to_string(),
            reference: reference.to_string(),
        })?;

        if self
            .active_refs
            .iter()
            .any(|active| active.encloses(&target) || target.encloses(active))
        {
            debug!("not re-entering recursive $ref {reference} at {path}");
            return Ok(());
        }

        let slot = target
            .resolve_mut(&mut self.definitions)
            .ok_or_else(|| SchemaError::UnresolvedRef {
                path: path.to_string(),
                reference: reference.to_string(),
            })?;
        if !slot.is_object() {
            return Ok(());
        }

        // Detach the target while it is walked so the arena stays borrowable
        // for nested references.
        let mut detached = std::mem::take(slot);
        self.active_refs.push(target.clone());
        let result = match &mut detached {
            Value::Object(map) => self.walk(path, map),
            _ => Ok(Visit::Keep),
        };
        self.active_refs.pop();

        if let Some(slot) = target.resolve_mut(&mut self.definitions) {
            *slot = detached;
        }
        if result? == Visit::Remove {
            debug!("processor removed definition {reference} at {path}, kept in definitions");
        }
        Ok(())
    }

    fn walk_map(&mut self, path: &SchemaPath, map: &mut Map<String, Value>) -> Result<()> {
        let keys: Vec<String> = map.keys().cloned().collect();
        let mut removed = Vec::new();
        for key in keys {
            if let Some(Value::Object(child)) = map.get_mut(&key)
                && self.walk(&path.child(key.as_str()), child)? == Visit::Remove
            {
                removed.push(key);
            }
        }
        if !removed.is_empty() {
            map.retain(|key, _| !removed.contains(key));
        }
        Ok(())
    }

    fn walk_sequence(&mut self, path: &SchemaPath, entries: &mut Vec<Value>) -> Result<()> {
        let mut removed = Vec::new();
        for (index, entry) in entries.iter_mut().enumerate() {
            if let Value::Object(child) = entry
                && self.walk(&path.child(index.to_string()), child)? == Visit::Remove
            {
                removed.push(index);
            }
        }
        if !removed.is_empty() {
            let mut index = 0;
            entries.retain(|_| {
                let keep = !removed.contains(&index);
                index += 1;
                keep
            });
        }
        Ok(())
    }
}
