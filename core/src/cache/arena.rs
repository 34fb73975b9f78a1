//! Handle arena.
//!
//! Every issued handle owns a slot. A slot records the handle's path, the
//! value kind it was issued for and a generation counter; invalidating a
//! slot bumps the generation so every handle still pointing at it sees a
//! mismatch. Cached slots are also reachable through the key index, which
//! is what gives repeated lookups the same handle back.

use std::collections::HashMap;
use std::rc::{Rc, Weak};

use super::key::CacheKey;
use crate::address::Segment;
use crate::handle::HandleCell;
use crate::value::ValueKind;

/// Slot count at which dropped-but-never-invalidated slots are first swept.
const INITIAL_SWEEP: usize = 64;


/// Position plus generation of a slot at the time a handle was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SlotId {
    pub index: usize,
    pub generation: u64,
}


#[derive(Debug)]
struct Slot {
    generation: u64,
    occupied: bool,
    path: Vec<Segment>,
    kind: Option<ValueKind>,
    key: Option<CacheKey>,
    holder: Weak<HandleCell>,
}

impl Slot {
    fn vacant() -> Self {
        Slot {
            generation: 0,
            occupied: false,
            path: Vec::new(),
            kind: None,
            key: None,
            holder: Weak::new(),
        }
    }
}


#[derive(Debug)]
pub(crate) struct HandleArena {
    slots: Vec<Slot>,
    free: Vec<usize>,
    index: HashMap<CacheKey, usize>,
    sweep_at: usize,
}

impl HandleArena {
    pub fn new() -> Self {
        HandleArena {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            sweep_at: INITIAL_SWEEP,
        }
    }

    /// The live cached handle for `key`, if any.
    pub fn lookup(&self, key: &CacheKey) -> Option<Rc<HandleCell>> {
        let &index = self.index.get(key)?;
        let slot = &self.slots[index];
        let cell = slot.holder.upgrade()?;
        (slot.occupied && cell.id().generation == slot.generation).then_some(cell)
    }

    /// Occupy a slot and build its handle with `make`.
    ///
    /// With `cache` set the slot also becomes the index entry for `key`,
    /// replacing whatever was indexed there before.
    pub fn issue(
        &mut self,
        path: Vec<Segment>,
        kind: Option<ValueKind>,
        key: CacheKey,
        cache: bool,
        make: impl FnOnce(SlotId) -> Rc<HandleCell>,
    ) -> Rc<HandleCell> {
        let index = self.allocate();
        let slot = &mut self.slots[index];
        let id = SlotId {
            index,
            generation: slot.generation,
        };
        let cell = make(id);

        slot.occupied = true;
        slot.path = path;
        slot.kind = kind;
        slot.holder = Rc::downgrade(&cell);
        slot.key = if cache { Some(key) } else { None };
        if cache {
            self.index.insert(key, index);
        }
        cell
    }

    pub fn is_live(&self, id: SlotId) -> bool {
        self.slots
            .get(id.index)
            .is_some_and(|s| s.occupied && s.generation == id.generation)
    }

    /// Invalidate the slot behind `id` if it is still live.
    pub fn retire_id(&mut self, id: SlotId) -> bool {
        if self.is_live(id) {
            self.retire(id.index);
            true
        } else {
            false
        }
    }

    /// Invalidate and evict every occupied slot for which `stale` holds.
    /// `stale` receives the slot's path and the kind it was issued for.
    pub fn retire_matching(
        &mut self,
        mut stale: impl FnMut(&[Segment], Option<ValueKind>) -> bool,
    ) -> Vec<Vec<Segment>> {
        let doomed: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.occupied && stale(&s.path, s.kind))
            .map(|(i, _)| i)
            .collect();
        doomed
            .into_iter()
            .map(|i| {
                let path = self.slots[i].path.clone();
                self.retire(i);
                path
            })
            .collect()
    }

    /// Number of index entries whose handle is still held somewhere.
    pub fn cached_len(&self) -> usize {
        self.index
            .values()
            .filter(|&&i| self.slots[i].holder.strong_count() > 0)
            .count()
    }

    /// Number of occupied slots.
    #[cfg(test)]
    pub fn live_len(&self) -> usize {
        self.slots.iter().filter(|s| s.occupied).count()
    }

    fn retire(&mut self, index: usize) {
        let key = {
            let slot = &mut self.slots[index];
            if !slot.occupied {
                return;
            }
            slot.occupied = false;
            slot.generation += 1;
            slot.holder = Weak::new();
            slot.kind = None;
            slot.path.clear();
            slot.key.take()
        };
        if let Some(key) = key {
            if self.index.get(&key) == Some(&index) {
                self.index.remove(&key);
            }
        }
        self.free.push(index);
    }

    fn allocate(&mut self) -> usize {
        if let Some(index) = self.free.pop() {
            return index;
        }
        if self.slots.len() >= self.sweep_at {
            self.sweep();
            self.sweep_at = (self.slots.len() * 2).max(INITIAL_SWEEP);
            if let Some(index) = self.free.pop() {
                return index;
            }
        }
        self.slots.push(Slot::vacant());
        self.slots.len() - 1
    }

    /// Reclaim occupied slots whose handles have all been dropped.
    fn sweep(&mut self) {
        let dead: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.occupied && s.holder.strong_count() == 0)
            .map(|(i, _)| i)
            .collect();
        for index in dead {
            self.retire(index);
        }
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::document::Document;
    use serde_json::json;

    fn issue(
        arena: &mut HandleArena,
        doc: &Document,
        path: &str,
        cache: bool,
    ) -> Rc<HandleCell> {
        let segments: Vec<Segment> = path.split('/').map(Segment::from).collect();
        let key = CacheKey::of_path(&segments, "/");
        let context = Context::new(segments.clone(), "/");
        arena.issue(segments, Some(ValueKind::String), key, cache, |id| {
            Rc::new(HandleCell::new(doc.clone(), id, context))
        })
    }

    #[test]
    fn cached_issue_is_found_by_key() {
        let doc = Document::new(json!({"a": "x"}));
        let mut arena = HandleArena::new();
        let cell = issue(&mut arena, &doc, "a", true);
        let found = arena.lookup(&CacheKey::digest("a")).unwrap();
        assert!(Rc::ptr_eq(&cell, &found));
        assert_eq!(arena.cached_len(), 1);
    }

    #[test]
    fn uncached_issue_is_not_indexed() {
        let doc = Document::new(json!({"a": "x"}));
        let mut arena = HandleArena::new();
        let _cell = issue(&mut arena, &doc, "a", false);
        assert!(arena.lookup(&CacheKey::digest("a")).is_none());
        assert_eq!(arena.live_len(), 1);
    }

    #[test]
    fn retire_bumps_generation_and_evicts() {
        let doc = Document::new(json!({"a": "x"}));
        let mut arena = HandleArena::new();
        let cell = issue(&mut arena, &doc, "a", true);
        let id = cell.id();
        assert!(arena.is_live(id));
        assert!(arena.retire_id(id));
        assert!(!arena.is_live(id));
        assert!(!arena.retire_id(id));
        assert!(arena.lookup(&CacheKey::digest("a")).is_none());
    }

    #[test]
    fn reused_slot_does_not_revive_stale_handles() {
        let doc = Document::new(json!({"a": "x", "b": "y"}));
        let mut arena = HandleArena::new();
        let old = issue(&mut arena, &doc, "a", true);
        arena.retire_id(old.id());
        let new = issue(&mut arena, &doc, "b", true);
        assert_eq!(old.id().index, new.id().index);
        assert!(!arena.is_live(old.id()));
        assert!(arena.is_live(new.id()));
    }

    #[test]
    fn dropped_handles_miss_and_get_swept() {
        let doc = Document::new(json!({}));
        let mut arena = HandleArena::new();
        for i in 0..INITIAL_SWEEP {
            drop(issue(&mut arena, &doc, &format!("k{}", i), true));
        }
        assert!(arena.lookup(&CacheKey::digest("k0")).is_none());
        assert_eq!(arena.cached_len(), 0);
        let _kept = issue(&mut arena, &doc, "fresh", true);
        assert_eq!(arena.live_len(), 1);
    }

    #[test]
    fn retire_matching_reports_paths() {
        let doc = Document::new(json!({}));
        let mut arena = HandleArena::new();
        let _a = issue(&mut arena, &doc, "a", true);
        let _ab = issue(&mut arena, &doc, "a/b", true);
        let _c = issue(&mut arena, &doc, "c", true);
        let prefix = vec![Segment::Key("a".into())];
        let retired = arena.retire_matching(|path, _| path.starts_with(&prefix));
        assert_eq!(retired.len(), 2);
        assert_eq!(arena.live_len(), 1);
    }
}
