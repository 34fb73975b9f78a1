//! Resolver: executes an address against a context.
//!
//! Resolution never fails: an address that does not match the current
//! document shape yields no handles. Handles come from the document's cache
//! whenever caching is requested, so the same canonical address always
//! hands back the same live handle.

use std::borrow::Cow;

use serde_json::Value;
use tracing::{debug, trace};

use crate::address::{Address, Segment};
use crate::cache::CacheKey;
use crate::context::{walk, walk_from, Context};
use crate::document::Document;
use crate::error::Result;
use crate::handle::Handle;
use crate::value::ValueKind;


/// A concrete location found by a walk, with the kind of value there.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Target {
    pub path: Vec<Segment>,
    pub kind: ValueKind,
}


/// Find the locations `address` denotes from `context`.
///
/// A slice-terminated address over a sequence yields one target per
/// selected element, each spelled with its concrete index in place of the
/// slice. Returns `None` when the address does not resolve.
pub(crate) fn locate(document: &Document, address: &Address, context: &Context) -> Option<Vec<Target>> {
    let full_path = address.full_path(context.path());
    let root = document.value();
    let start = if address.is_relative() && !context.is_root() {
        walk(&root, context.path())?
    } else {
        Cow::Borrowed(&*root)
    };

    match address.segments().split_last() {
        Some((Segment::Slice(spec), prefix)) => {
            let parent = walk_from(start, prefix)?;
            let Value::Array(items) = &*parent else {
                return None;
            };
            let base = &full_path[..full_path.len() - 1];
            let targets = spec
                .indices(items.len())?
                .into_iter()
                .map(|i| {
                    let mut path = base.to_vec();
                    path.push(Segment::Index(i as i64));
                    Target {
                        path,
                        kind: ValueKind::of(&items[i]),
                    }
                })
                .collect();
            Some(targets)
        }
        _ => {
            let found = walk_from(start, address.segments())?;
            Some(vec![Target {
                kind: ValueKind::of(&found),
                path: full_path,
            }])
        }
    }
}


/// Resolve `address` from `context` into zero, one or many handles.
pub(crate) fn resolve(
    document: &Document,
    address: &Address,
    context: &Context,
    use_cache: bool,
) -> Vec<Handle> {
    let full_path = address.full_path(context.path());
    let key = CacheKey::of_path(&full_path, address.delimiter());

    if use_cache && !address.ends_with_slice() {
        if let Some(handle) = document.cached(&key) {
            debug!(address = %address, key = %key, "cache hit");
            return vec![handle];
        }
    }

    match locate(document, address, context) {
        None => {
            trace!(address = %address, "address did not resolve");
            Vec::new()
        }
        Some(targets) => {
            debug!(address = %address, key = %key, found = targets.len(), "cache miss");
            targets
                .into_iter()
                .map(|t| document.obtain(t.path, t.kind, use_cache))
                .collect()
        }
    }
}


/// Write `value` at every location `address` resolves to. When nothing
/// resolves, the value is written into the existing parent at the final
/// key; a missing parent is an error.
pub(crate) fn update(document: &Document, address: &Address, context: &Context, value: Value) -> Result<()> {
    let paths: Vec<Vec<Segment>> = match locate(document, address, context) {
        Some(targets) if !targets.is_empty() => targets.into_iter().map(|t| t.path).collect(),
        _ => vec![address.full_path(context.path())],
    };
    for path in paths {
        Context::new(path, address.delimiter()).write_raw(document, value.clone())?;
    }
    Ok(())
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
