//! Handle cache, one per document.
//!
//! Handles are indexed by a digest of their canonical path so that every
//! call site resolving the same location gets the same live handle.

pub mod key;
pub(crate) mod arena;

pub use key::CacheKey;
pub(crate) use arena::{HandleArena, SlotId};
