//! Cache keys: blake3 digests of canonical paths.

use std::fmt;

use crate::address::{join_path, Segment};

/// A 256-bit digest of a delimiter-joined canonical path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    /// Digest an already-joined canonical path string.
    pub fn digest(source: &str) -> Self {
        Self(*blake3::hash(source.as_bytes()).as_bytes())
    }

    /// Digest a path of segments joined with `delimiter`.
    pub fn of_path(path: &[Segment], delimiter: &str) -> Self {
        Self::digest(&join_path(path, delimiter))
    }

    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 16 hex chars are plenty for log lines.
        write!(f, "{}", &self.to_hex()[..16])
    }
}
