//! Contexts: a path into a document plus the delimiter used to spell it.
//!
//! A context never owns the document; every operation receives the
//! `Document` explicitly and walks it from the root. Walks that step
//! through a slice materialise the selected elements, so such paths can be
//! read but not written.

use std::borrow::Cow;

use serde_json::Value;
use tracing::{debug, trace};

use crate::address::segment::normalize_index;
use crate::address::{join_path, Segment};
use crate::cache::CacheKey;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::value::ValueKind;


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    path: Vec<Segment>,
    delimiter: String,
}

impl Context {
    /// The document root's own context: an empty path.
    pub fn root(delimiter: &str) -> Self {
        Context::new(Vec::new(), delimiter)
    }

    pub fn new(path: Vec<Segment>, delimiter: &str) -> Self {
        Context {
            path,
            delimiter: delimiter.to_string(),
        }
    }

    pub fn path(&self) -> &[Segment] {
        &self.path
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Digest of the delimiter-joined path.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::of_path(&self.path, &self.delimiter)
    }

    /// Absolute spelling of this context, e.g. `/app/authors/0`.
    pub fn address(&self) -> String {
        format!("{}{}", self.delimiter, join_path(&self.path, &self.delimiter))
    }

    /// A copy of the value at this path, or `None` when the path does not
    /// resolve against the current document shape.
    pub fn raw_value(&self, document: &Document) -> Option<Value> {
        let root = document.value();
        walk(&root, &self.path).map(Cow::into_owned)
    }

    pub fn kind(&self, document: &Document) -> Option<ValueKind> {
        let root = document.value();
        walk(&root, &self.path).map(|v| ValueKind::of(&v))
    }

    /// Assign `value` at this path.
    ///
    /// The parent must already exist; missing mapping keys are created but
    /// intermediate containers never are. When the value's kind differs from
    /// what was there before, handles for this exact path are invalidated;
    /// with cascading enabled, handles below it are re-checked as well.
    pub fn write_raw(&self, document: &Document, value: Value) -> Result<()> {
        let incoming = ValueKind::of(&value);
        let previous = {
            let mut root = document.value_mut();
            let previous = walk(&root, &self.path).map(|v| ValueKind::of(&v));
            match self.path.split_last() {
                None => *root = value,
                Some((last, parent_path)) => {
                    if self.path.iter().any(Segment::is_slice) {
                        return Err(self.missing());
                    }
                    let parent = walk_mut(&mut root, parent_path).ok_or_else(|| self.missing())?;
                    if !assign(parent, last, value) {
                        return Err(self.missing());
                    }
                }
            }
            previous
        };

        debug!(address = %self.address(), kind = %incoming, "wrote value");
        if previous != Some(incoming) {
            document.invalidate_path(&self.path);
        }
        if document.settings().cascade_invalidation {
            document.revalidate_below(&self.path);
        }
        Ok(())
    }

    /// Remove the entry at this path from its parent and return it.
    ///
    /// Handles for this exact path are invalidated. With cascading enabled
    /// the parent's subtree is re-checked too, which catches handles below
    /// the removed entry and siblings whose position now holds a different
    /// kind of value.
    pub fn delete(&self, document: &Document) -> Result<Value> {
        let (last, parent_path) = self.path.split_last().ok_or_else(|| self.missing())?;
        if self.path.iter().any(Segment::is_slice) {
            return Err(self.missing());
        }
        let removed = {
            let mut root = document.value_mut();
            let parent = walk_mut(&mut root, parent_path).ok_or_else(|| self.missing())?;
            remove_entry(parent, last).ok_or_else(|| self.missing())?
        };

        debug!(address = %self.address(), "deleted value");
        document.invalidate_path(&self.path);
        if document.settings().cascade_invalidation {
            document.revalidate_below(parent_path);
        }
        Ok(removed)
    }

    fn missing(&self) -> Error {
        Error::WriteTargetMissing(self.address())
    }
}


// ---------------------------------------------------------------------------
// Walking
// ---------------------------------------------------------------------------

/// Walk `path` from `root`. Borrowed all the way unless a slice is crossed.
pub(crate) fn walk<'v>(root: &'v Value, path: &[Segment]) -> Option<Cow<'v, Value>> {
    walk_from(Cow::Borrowed(root), path)
}

/// Continue a walk from an intermediate value.
pub(crate) fn walk_from<'v>(start: Cow<'v, Value>, path: &[Segment]) -> Option<Cow<'v, Value>> {
    path.iter().try_fold(start, |current, segment| {
        let next = step(current, segment);
        if next.is_none() {
            trace!(segment = %segment, "walk stopped");
        }
        next
    })
}

/// `path` with each sequence index spelled as its non-negative position in
/// `root`. Segments past the point where the walk stops are kept as written.
pub(crate) fn concrete_path(root: &Value, path: &[Segment]) -> Vec<Segment> {
    let mut out = Vec::with_capacity(path.len());
    let mut current = Some(Cow::Borrowed(root));
    for segment in path {
        let spelled = match (current.as_deref(), segment) {
            (Some(Value::Array(items)), Segment::Index(i)) => normalize_index(*i, items.len())
                .map(|i| Segment::Index(i as i64))
                .unwrap_or_else(|| segment.clone()),
            _ => segment.clone(),
        };
        current = current.and_then(|v| step(v, segment));
        out.push(spelled);
    }
    out
}

fn step<'v>(current: Cow<'v, Value>, segment: &Segment) -> Option<Cow<'v, Value>> {
    match current {
        Cow::Borrowed(value) => step_ref(value, segment),
        Cow::Owned(value) => step_ref(&value, segment).map(|v| Cow::Owned(v.into_owned())),
    }
}

fn step_ref<'v>(value: &'v Value, segment: &Segment) -> Option<Cow<'v, Value>> {
    match (value, segment) {
        (Value::Object(map), Segment::Key(k)) => map.get(k).map(Cow::Borrowed),
        // Mapping keys are always strings; an index segment names the
        // key spelled the same way.
        (Value::Object(map), Segment::Index(i)) => map.get(&i.to_string()).map(Cow::Borrowed),
        (Value::Array(items), Segment::Index(i)) => {
            normalize_index(*i, items.len()).map(|i| Cow::Borrowed(&items[i]))
        }
        (Value::Array(items), Segment::Slice(spec)) => spec.indices(items.len()).map(|selected| {
            Cow::Owned(Value::Array(
                selected.into_iter().map(|i| items[i].clone()).collect(),
            ))
        }),
        _ => None,
    }
}

fn walk_mut<'v>(root: &'v mut Value, path: &[Segment]) -> Option<&'v mut Value> {
    path.iter().try_fold(root, |current, segment| step_mut(current, segment))
}

fn step_mut<'v>(value: &'v mut Value, segment: &Segment) -> Option<&'v mut Value> {
    match (value, segment) {
        (Value::Object(map), Segment::Key(k)) => map.get_mut(k),
        (Value::Object(map), Segment::Index(i)) => map.get_mut(&i.to_string()),
        (Value::Array(items), Segment::Index(i)) => {
            let i = normalize_index(*i, items.len())?;
            items.get_mut(i)
        }
        _ => None,
    }
}

fn assign(parent: &mut Value, segment: &Segment, value: Value) -> bool {
    match (parent, segment) {
        (Value::Object(map), Segment::Key(k)) => {
            map.insert(k.clone(), value);
            true
        }
        (Value::Object(map), Segment::Index(i)) => {
            map.insert(i.to_string(), value);
            true
        }
        (Value::Array(items), Segment::Index(i)) => match normalize_index(*i, items.len()) {
            Some(i) => {
                items[i] = value;
                true
            }
            None => false,
        },
        _ => false,
    }
}

fn remove_entry(parent: &mut Value, segment: &Segment) -> Option<Value> {
    match (parent, segment) {
        (Value::Object(map), Segment::Key(k)) => map.shift_remove(k),
        (Value::Object(map), Segment::Index(i)) => map.shift_remove(&i.to_string()),
        (Value::Array(items), Segment::Index(i)) => {
            let i = normalize_index(*i, items.len())?;
            Some(items.remove(i))
        }
        _ => None,
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
