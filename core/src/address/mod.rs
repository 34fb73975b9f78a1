//! Address parsing.
//!
//! Turns a raw query (a delimited string like `app/authors/0/name`, a bare
//! integer or a slice) into an ordered list of typed segments, and records
//! whether the address is absolute (leading delimiter, resolved from the
//! document root) or relative to the caller's context.
//!
//! Parsing is lenient: nothing is rejected, anything that is neither an index
//! nor a slice is a mapping key.

pub mod segment;

use std::fmt;

pub use segment::{classify, join_path, Segment, SliceSpec};

/// The delimiter used when none is configured.
pub const DEFAULT_DELIMITER: &str = "/";


/// A raw query before parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum Query<'a> {
    Text(&'a str),
    Index(i64),
    Slice(SliceSpec),
}

impl<'a> From<&'a str> for Query<'a> {
    fn from(s: &'a str) -> Self {
        Query::Text(s)
    }
}

impl<'a> From<&'a String> for Query<'a> {
    fn from(s: &'a String) -> Self {
        Query::Text(s.as_str())
    }
}

impl From<i64> for Query<'_> {
    fn from(i: i64) -> Self {
        Query::Index(i)
    }
}

impl From<i32> for Query<'_> {
    fn from(i: i32) -> Self {
        Query::Index(i64::from(i))
    }
}

impl From<SliceSpec> for Query<'_> {
    fn from(s: SliceSpec) -> Self {
        Query::Slice(s)
    }
}


/// A parsed address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    segments: Vec<Segment>,
    absolute: bool,
    delimiter: String,
}

impl Address {
    /// Parse a query with the given delimiter.
    ///
    /// Integers and slices become single-segment relative addresses. Strings
    /// are trimmed; a leading delimiter marks the address absolute and is
    /// stripped, and the remainder is split and classified segment by
    /// segment. The empty string addresses the context itself.
    pub fn parse<'a>(query: impl Into<Query<'a>>, delimiter: &str) -> Self {
        match query.into() {
            Query::Index(i) => Address::relative(vec![Segment::Index(i)], delimiter),
            Query::Slice(s) => Address::relative(vec![Segment::Slice(s)], delimiter),
            Query::Text(raw) => {
                let raw = raw.trim();
                let (absolute, rest) = match raw.strip_prefix(delimiter) {
                    Some(rest) if !delimiter.is_empty() => (true, rest),
                    _ => (false, raw),
                };
                let segments = if rest.is_empty() {
                    Vec::new()
                } else if delimiter.is_empty() {
                    vec![classify(rest)]
                } else {
                    rest.split(delimiter).map(classify).collect()
                };
                Address {
                    segments,
                    absolute,
                    delimiter: delimiter.to_string(),
                }
            }
        }
    }

    /// Build a relative address from already-typed segments.
    pub fn relative(segments: Vec<Segment>, delimiter: &str) -> Self {
        Address {
            segments,
            absolute: false,
            delimiter: delimiter.to_string(),
        }
    }

    /// Build an absolute address from already-typed segments.
    pub fn absolute(segments: Vec<Segment>, delimiter: &str) -> Self {
        Address {
            segments,
            absolute: true,
            delimiter: delimiter.to_string(),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    pub fn is_relative(&self) -> bool {
        !self.absolute
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// True when the final segment is a slice.
    pub fn ends_with_slice(&self) -> bool {
        self.segments.last().is_some_and(Segment::is_slice)
    }

    /// The document path this address denotes from `context_path`.
    pub fn full_path(&self, context_path: &[Segment]) -> Vec<Segment> {
        if self.absolute {
            self.segments.clone()
        } else {
            let mut path = context_path.to_vec();
            path.extend(self.segments.iter().cloned());
            path
        }
    }

    /// Delimiter-joined canonical form of `full_path`, the cache key source.
    pub fn canonical(&self, context_path: &[Segment]) -> String {
        join_path(&self.full_path(context_path), &self.delimiter)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absolute {
            f.write_str(&self.delimiter)?;
        }
        f.write_str(&join_path(&self.segments, &self.delimiter))
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> Segment {
        Segment::Key(s.into())
    }

    #[test]
    fn parse_single_key() {
        let a = Address::parse("test", "/");
        assert_eq!(a.segments(), &[key("test")]);
        assert!(a.is_relative());
    }

    #[test]
    fn parse_absolute() {
        let a = Address::parse("/test/test", "/");
        assert_eq!(a.segments(), &[key("test"), key("test")]);
        assert!(a.is_absolute());
        assert!(!a.is_relative());
    }

    #[test]
    fn parse_mixed_path() {
        let a = Address::parse("test/test/-1", "/");
        assert_eq!(a.segments(), &[key("test"), key("test"), Segment::Index(-1)]);

        let a = Address::parse("/test/test/0:10:2", "/");
        assert!(a.is_absolute());
        assert_eq!(
            a.segments()[2],
            Segment::Slice(SliceSpec::new(Some(0), Some(10), Some(2)))
        );
        assert!(a.ends_with_slice());
    }

    #[test]
    fn parse_trims_whitespace() {
        let a = Address::parse("  /app/name \n", "/");
        assert!(a.is_absolute());
        assert_eq!(a.segments(), &[key("app"), key("name")]);
    }

    #[test]
    fn empty_and_root_addresses_have_no_segments() {
        let a = Address::parse("", "/");
        assert!(a.segments().is_empty());
        assert!(a.is_relative());

        let a = Address::parse("/", "/");
        assert!(a.segments().is_empty());
        assert!(a.is_absolute());
    }

    #[test]
    fn parse_integer_and_slice_queries() {
        let a = Address::parse(-1i64, "/");
        assert_eq!(a.segments(), &[Segment::Index(-1)]);
        assert!(a.is_relative());

        let spec = SliceSpec::new(Some(1), Some(3), None);
        let a = Address::parse(spec, "/");
        assert_eq!(a.segments(), &[Segment::Slice(spec)]);
        assert!(a.ends_with_slice());
    }

    #[test]
    fn custom_delimiter() {
        let a = Address::parse(".app.tags.0", ".");
        assert!(a.is_absolute());
        assert_eq!(a.segments(), &[key("app"), key("tags"), Segment::Index(0)]);
        // With `.` as delimiter, `/` is an ordinary key character.
        let a = Address::parse("a/b", ".");
        assert_eq!(a.segments(), &[key("a/b")]);
    }

    #[test]
    fn canonical_prepends_context_only_when_relative() {
        let context = vec![key("app"), key("authors"), Segment::Index(0)];
        let rel = Address::parse("name", "/");
        assert_eq!(rel.canonical(&context), "app/authors/0/name");

        let abs = Address::parse("/app/tags/0", "/");
        assert_eq!(abs.canonical(&context), "app/tags/0");
    }

    #[test]
    fn canonical_renders_slices_with_three_parts() {
        let a = Address::parse("list/1:3", "/");
        assert_eq!(a.canonical(&[]), "list/1:3:");
    }

    #[test]
    fn same_canonical_path_from_different_call_sites() {
        let from_root = Address::parse("app/name", "/");
        let from_app = Address::parse("name", "/");
        assert_eq!(
            from_root.canonical(&[]),
            from_app.canonical(&[key("app")])
        );
    }

    #[test]
    fn display_round_trips_text() {
        assert_eq!(Address::parse("/a/0/1:", "/").to_string(), "/a/0/1::");
        assert_eq!(Address::parse("a/b", "/").to_string(), "a/b");
    }
}
