//! Live handles onto document locations.
//!
//! A `Handle` is a cheap shared reference to a slot in its document's
//! arena. Cloning a handle shares the same cell, so identity (`ptr_eq`) is
//! what the cache preserves across repeated lookups. Once the slot is
//! invalidated every operation except the identity accessors fails with
//! `Error::InvalidReference`.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::address::{Address, Query, Segment};
use crate::cache::{CacheKey, SlotId};
use crate::context::Context;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::export;
use crate::resolver;
use crate::template;
use crate::value::ValueKind;
use crate::view::View;


/// Shared state behind one issued handle.
pub(crate) struct HandleCell {
    document: Document,
    id: SlotId,
    context: Context,
}

impl HandleCell {
    pub(crate) fn new(document: Document, id: SlotId, context: Context) -> Self {
        HandleCell {
            document,
            id,
            context,
        }
    }

    pub(crate) fn id(&self) -> SlotId {
        self.id
    }
}


#[derive(Clone)]
pub struct Handle {
    cell: Rc<HandleCell>,
}

impl Handle {
    pub(crate) fn from_cell(cell: Rc<HandleCell>) -> Self {
        Handle { cell }
    }

    fn document(&self) -> &Document {
        &self.cell.document
    }

    fn context(&self) -> &Context {
        &self.cell.context
    }

    // -- identity -----------------------------------------------------------

    pub fn is_valid(&self) -> bool {
        self.document().handle_is_live(self.cell.id)
    }

    /// Invalidate this handle. Every holder of it sees the change, and the
    /// next lookup of the same address issues a fresh handle.
    pub fn invalidate(&self) {
        self.document().retire(self.cell.id);
    }

    pub fn path(&self) -> &[Segment] {
        self.context().path()
    }

    /// Absolute spelling of this handle's location, e.g. `/app/name`.
    pub fn address(&self) -> String {
        self.context().address()
    }

    pub fn cache_key(&self) -> CacheKey {
        self.context().cache_key()
    }

    /// True when both handles share one cell.
    pub fn ptr_eq(&self, other: &Handle) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    fn ensure_valid(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(self.invalid())
        }
    }

    fn invalid(&self) -> Error {
        Error::InvalidReference {
            path: self.address(),
        }
    }

    // -- values -------------------------------------------------------------

    /// The stored value, without template substitution.
    pub fn raw_value(&self) -> Result<Value> {
        self.ensure_valid()?;
        self.context()
            .raw_value(self.document())
            .ok_or_else(|| self.invalid())
    }

    /// Overwrite the stored value in place. Identity survives unless the new
    /// value has a different kind, in which case this handle is invalidated.
    pub fn set_raw_value(&self, value: Value) -> Result<()> {
        self.ensure_valid()?;
        self.context().write_raw(self.document(), value)
    }

    /// The stored value with every `$r{...}` and `$e{...}` substituted.
    pub fn parsed_value(&self) -> Result<Value> {
        let raw = self.raw_value()?;
        template::resolve_from(self.document(), &raw, self.path())
    }

    pub fn kind(&self) -> Result<ValueKind> {
        self.ensure_valid()?;
        self.context()
            .kind(self.document())
            .ok_or_else(|| self.invalid())
    }

    // -- navigation ---------------------------------------------------------

    /// Resolve `query` relative to this handle, using the document's cache
    /// setting.
    pub fn query<'a>(&self, query: impl Into<Query<'a>>) -> Result<Vec<Handle>> {
        let use_cache = self.document().settings().use_cache;
        self.query_with(query, use_cache)
    }

    pub fn query_with<'a>(&self, query: impl Into<Query<'a>>, use_cache: bool) -> Result<Vec<Handle>> {
        self.ensure_valid()?;
        let address = self.parse(query);
        Ok(resolver::resolve(self.document(), &address, self.context(), use_cache))
    }

    /// First handle `query` resolves to.
    pub fn get<'a>(&self, query: impl Into<Query<'a>>) -> Result<Option<Handle>> {
        Ok(self.query(query)?.into_iter().next())
    }

    /// Like [`get`](Self::get), but an empty result is `Error::MissingMember`.
    pub fn at<'a>(&self, query: impl Into<Query<'a>>) -> Result<Handle> {
        let address = self.parse(query);
        self.ensure_valid()?;
        let use_cache = self.document().settings().use_cache;
        resolver::resolve(self.document(), &address, self.context(), use_cache)
            .into_iter()
            .next()
            .ok_or_else(|| Error::MissingMember(address.canonical(self.path())))
    }

    /// Write `value` at `query`, relative to this handle.
    pub fn set<'a>(&self, query: impl Into<Query<'a>>, value: Value) -> Result<()> {
        self.ensure_valid()?;
        let address = self.parse(query);
        resolver::update(self.document(), &address, self.context(), value)
    }

    /// Remove the entry at `query`, relative to this handle.
    pub fn delete_at<'a>(&self, query: impl Into<Query<'a>>) -> Result<Value> {
        self.ensure_valid()?;
        let address = self.parse(query);
        Context::new(address.full_path(self.path()), address.delimiter()).delete(self.document())
    }

    /// Remove this handle's own entry from its parent. The handle is
    /// invalidated as a result.
    pub fn delete(&self) -> Result<Value> {
        self.ensure_valid()?;
        self.context().delete(self.document())
    }

    /// The child one segment below this handle. Used by views so that keys
    /// are never re-parsed.
    pub(crate) fn child(&self, segment: Segment) -> Result<Option<Handle>> {
        self.ensure_valid()?;
        let address = Address::relative(vec![segment], self.context().delimiter());
        let use_cache = self.document().settings().use_cache;
        Ok(resolver::resolve(self.document(), &address, self.context(), use_cache)
            .into_iter()
            .next())
    }

    pub(crate) fn write_child(&self, segment: Segment, value: Value) -> Result<()> {
        self.ensure_valid()?;
        let mut path = self.path().to_vec();
        path.push(segment);
        Context::new(path, self.context().delimiter()).write_raw(self.document(), value)
    }

    pub(crate) fn delete_child(&self, segment: Segment) -> Result<Value> {
        self.ensure_valid()?;
        let mut path = self.path().to_vec();
        path.push(segment);
        Context::new(path, self.context().delimiter()).delete(self.document())
    }

    fn parse<'a>(&self, query: impl Into<Query<'a>>) -> Address {
        Address::parse(query, self.context().delimiter())
    }

    // -- export -------------------------------------------------------------

    pub fn to_json(&self) -> Result<String> {
        export::to_json(&self.parsed_value()?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        export::to_json_pretty(&self.parsed_value()?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        export::to_yaml(&self.parsed_value()?)
    }

    /// The typed view for the current value.
    pub fn view(&self) -> Result<View> {
        View::of(self)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("address", &self.address())
            .field("valid", &self.is_valid())
            .finish()
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
