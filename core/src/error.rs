use std::path::PathBuf;

use thiserror::Error;

use crate::value::ValueKind;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors surfaced by documents, handles and views.
///
/// Structural lookup failures never appear here: an address that does not
/// resolve produces an empty result, not an error.
#[derive(Debug, Error)]
pub enum Error {
    /// The handle was invalidated by a type-changing write or a delete.
    #[error("reference to `{path}` is no longer valid: its value changed type or was removed")]
    InvalidReference { path: String },

    /// A write or delete addressed a parent that does not exist.
    #[error("cannot write `{0}`: the parent path does not exist")]
    WriteTargetMissing(String),

    /// A value does not have the shape an adapter requires.
    #[error("cannot convert {found} value to {expected}")]
    TypeConversion {
        expected: ValueKind,
        found: ValueKind,
    },

    /// Boundary-layer lookup of an address that resolved to nothing.
    #[error("no member at `{0}`")]
    MissingMember(String),

    /// A `$r{...}` chain re-entered an address it was already expanding.
    #[error("reference cycle detected while expanding `{0}`")]
    ReferenceCycle(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error when accessing `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("settings error: {0}")]
    Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
