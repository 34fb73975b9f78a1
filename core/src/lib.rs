//! Reflective documents: live, path-addressable handles over JSON/YAML
//! values.
//!
//! Addresses like `app/authors/0/name` resolve to handles that stay in sync
//! with the underlying document. Resolving the same location twice yields
//! the same handle until a write changes the value's kind or removes it.
//! String values may embed `$r{address}` and `$e{VAR}` references that are
//! substituted whenever a value is read through `parsed_value`.

pub mod address;
pub mod cache;
pub mod context;
pub mod document;
pub mod error;
pub mod export;
pub mod handle;
pub mod settings;
pub mod template;
pub mod value;
pub mod view;

mod resolver;

pub use address::{Address, Query, Segment, SliceSpec, DEFAULT_DELIMITER};
pub use cache::CacheKey;
pub use context::Context;
pub use document::Document;
pub use error::{Error, Result};
pub use handle::Handle;
pub use settings::Settings;
pub use value::ValueKind;
pub use view::View;
