//! Document root.
//!
//! Owns the mutable value tree, the settings it was opened with and the
//! arena of handles issued against it. Cloning a `Document` shares all of
//! that; the tree lives as long as any clone or handle does.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::path::Path;
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, info};

use crate::address::{Address, Query, Segment};
use crate::cache::{CacheKey, HandleArena, SlotId};
use crate::context::{concrete_path, walk, Context};
use crate::error::{Error, Result};
use crate::export;
use crate::handle::{Handle, HandleCell};
use crate::resolver;
use crate::settings::Settings;
use crate::template;
use crate::value::ValueKind;


struct DocumentInner {
    value: RefCell<Value>,
    arena: RefCell<HandleArena>,
    settings: Settings,
}


#[derive(Clone)]
pub struct Document {
    inner: Rc<DocumentInner>,
}

impl Document {
    pub fn new(value: Value) -> Self {
        Document::with_settings(value, Settings::default())
    }

    pub fn with_settings(value: Value, settings: Settings) -> Self {
        Document {
            inner: Rc::new(DocumentInner {
                value: RefCell::new(value),
                arena: RefCell::new(HandleArena::new()),
                settings,
            }),
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(Document::new(serde_json::from_str(text)?))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(Document::new(serde_yaml::from_str(text)?))
    }

    /// Read a document from disk. Files ending in `.json` are parsed as
    /// JSON, anything else as YAML.
    pub fn load(path: &Path, settings: Settings) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::Io(path.to_path_buf(), e))?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let value: Value = if is_json {
            serde_json::from_str(&text)?
        } else {
            serde_yaml::from_str(&text)?
        };
        info!(path = %path.display(), format = if is_json { "json" } else { "yaml" }, "loaded document");
        Ok(Document::with_settings(value, settings))
    }

    // -- lookups ------------------------------------------------------------

    /// Handle onto the whole document.
    pub fn root(&self) -> Handle {
        let kind = ValueKind::of(&self.value());
        self.obtain(Vec::new(), kind, self.settings().use_cache)
    }

    pub fn query<'a>(&self, query: impl Into<Query<'a>>) -> Vec<Handle> {
        self.query_with(query, self.settings().use_cache)
    }

    pub fn query_with<'a>(&self, query: impl Into<Query<'a>>, use_cache: bool) -> Vec<Handle> {
        let address = Address::parse(query, self.delimiter());
        resolver::resolve(self, &address, &Context::root(self.delimiter()), use_cache)
    }

    /// First match for `query`, or a handle onto a detached document holding
    /// only `default`.
    pub fn query_or<'a>(&self, query: impl Into<Query<'a>>, default: Value) -> Handle {
        match self.query(query).into_iter().next() {
            Some(handle) => handle,
            None => Document::with_settings(default, self.settings().clone()).root(),
        }
    }

    pub fn get<'a>(&self, query: impl Into<Query<'a>>) -> Option<Handle> {
        self.query(query).into_iter().next()
    }

    pub fn at<'a>(&self, query: impl Into<Query<'a>>) -> Result<Handle> {
        let address = Address::parse(query, self.delimiter());
        resolver::resolve(self, &address, &Context::root(self.delimiter()), self.settings().use_cache)
            .into_iter()
            .next()
            .ok_or_else(|| Error::MissingMember(address.canonical(&[])))
    }

    pub fn contains<'a>(&self, query: impl Into<Query<'a>>) -> bool {
        let address = Address::parse(query, self.delimiter());
        resolver::locate(self, &address, &Context::root(self.delimiter()))
            .is_some_and(|targets| !targets.is_empty())
    }

    // -- writes -------------------------------------------------------------

    /// Write `value` at `query`. Existing locations are overwritten in
    /// place; a new mapping key is created when its parent exists.
    pub fn set<'a>(&self, query: impl Into<Query<'a>>, value: Value) -> Result<()> {
        let address = Address::parse(query, self.delimiter());
        resolver::update(self, &address, &Context::root(self.delimiter()), value)
    }

    /// Remove the entry at `query` and return it.
    pub fn delete<'a>(&self, query: impl Into<Query<'a>>) -> Result<Value> {
        let address = Address::parse(query, self.delimiter());
        Context::new(address.full_path(&[]), self.delimiter()).delete(self)
    }

    // -- values -------------------------------------------------------------

    pub fn raw_value(&self) -> Value {
        self.value().clone()
    }

    pub fn parsed_value(&self) -> Result<Value> {
        let raw = self.raw_value();
        template::resolve(self, &raw)
    }

    pub fn to_json(&self) -> Result<String> {
        export::to_json(&self.parsed_value()?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        export::to_json_pretty(&self.parsed_value()?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        export::to_yaml(&self.parsed_value()?)
    }

    /// Number of cache entries whose handle is still held somewhere.
    pub fn cached_handles(&self) -> usize {
        self.inner.arena.borrow().cached_len()
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub fn delimiter(&self) -> &str {
        &self.inner.settings.delimiter
    }

    // -- crate internals ----------------------------------------------------

    pub(crate) fn value(&self) -> Ref<'_, Value> {
        self.inner.value.borrow()
    }

    pub(crate) fn value_mut(&self) -> RefMut<'_, Value> {
        self.inner.value.borrow_mut()
    }

    pub(crate) fn cached(&self, key: &CacheKey) -> Option<Handle> {
        self.inner.arena.borrow().lookup(key).map(Handle::from_cell)
    }

    /// The cached handle for `path`, or a newly issued one.
    pub(crate) fn obtain(&self, path: Vec<Segment>, kind: ValueKind, use_cache: bool) -> Handle {
        let key = CacheKey::of_path(&path, self.delimiter());
        if use_cache {
            if let Some(handle) = self.cached(&key) {
                return handle;
            }
        }
        let context = Context::new(path.clone(), self.delimiter());
        let cell = self
            .inner
            .arena
            .borrow_mut()
            .issue(path, Some(kind), key, use_cache, |id| {
                Rc::new(HandleCell::new(self.clone(), id, context))
            });
        debug!(slot = cell.id().index, key = %key, cached = use_cache, "issued handle");
        Handle::from_cell(cell)
    }

    pub(crate) fn handle_is_live(&self, id: SlotId) -> bool {
        self.inner.arena.borrow().is_live(id)
    }

    pub(crate) fn retire(&self, id: SlotId) {
        if self.inner.arena.borrow_mut().retire_id(id) {
            debug!(slot = id.index, "handle invalidated");
        }
    }

    /// Invalidate every handle issued for exactly `path`.
    pub(crate) fn invalidate_path(&self, path: &[Segment]) {
        let retired = self
            .inner
            .arena
            .borrow_mut()
            .retire_matching(|p, _| p == path);
        if !retired.is_empty() {
            debug!(count = retired.len(), "invalidated handles");
        }
    }

    /// Invalidate handles at or below `prefix` whose location no longer
    /// resolves or now holds a different kind of value. Negative indices
    /// are compared by the position they denote, so `list/-1` is checked
    /// when `list/1` of a two-element list is written.
    pub(crate) fn revalidate_below(&self, prefix: &[Segment]) {
        let root = self.value();
        let target = concrete_path(&root, prefix);
        let retired = self.inner.arena.borrow_mut().retire_matching(|p, kind| {
            let below = p.starts_with(prefix) || concrete_path(&root, p).starts_with(&target);
            below && walk(&root, p).map(|v| ValueKind::of(&v)) != kind
        });
        for path in &retired {
            debug!(path = %crate::address::join_path(path, self.delimiter()), "cascaded invalidation");
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("value", &*self.value())
            .field("settings", &self.inner.settings)
            .finish()
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
