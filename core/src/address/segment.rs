//! Path segments and slice arithmetic.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static INDEX_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?[0-9]+$").unwrap());

static SLICE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-?[0-9]+)?:(-?[0-9]+)?(?::(-?[0-9]+)?)?$").unwrap()
});


/// A `start:stop:step` selection over a sequence. Missing parts are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SliceSpec {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl SliceSpec {
    pub fn new(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Self {
        SliceSpec { start, stop, step }
    }

    /// The positions selected from a sequence of `len` elements, in order.
    ///
    /// Bounds are clamped and negative bounds count from the end. A zero
    /// step selects nothing and yields `None`.
    pub fn indices(&self, len: usize) -> Option<Vec<usize>> {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return None;
        }
        let len = len as i64;
        let (lower, upper) = if step > 0 { (0, len) } else { (-1, len - 1) };
        let clamp = |bound: Option<i64>, default: i64| match bound {
            None => default,
            Some(b) if b < 0 => (b + len).max(lower),
            Some(b) => b.min(upper),
        };
        let start = clamp(self.start, if step > 0 { lower } else { upper });
        let stop = clamp(self.stop, if step > 0 { upper } else { lower });

        let mut selected = Vec::new();
        let mut i = start;
        while (step > 0 && i < stop) || (step < 0 && i > stop) {
            selected.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
        Some(selected)
    }
}

impl fmt::Display for SliceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let part = |p: Option<i64>| p.map(|v| v.to_string()).unwrap_or_default();
        write!(f, "{}:{}:{}", part(self.start), part(self.stop), part(self.step))
    }
}


/// One step of an address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Mapping key, used verbatim.
    Key(String),
    /// Sequence position; negative values count from the end.
    Index(i64),
    /// Sub-sequence selection.
    Slice(SliceSpec),
}

impl Segment {
    pub fn is_slice(&self) -> bool {
        matches!(self, Segment::Slice(_))
    }
}

/// Canonical form: keys verbatim, indices as numbers, slices as
/// `start:stop:step` with empty missing parts.
impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(k) => f.write_str(k),
            Segment::Index(i) => write!(f, "{}", i),
            Segment::Slice(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Segment {
    fn from(raw: &str) -> Self {
        classify(raw)
    }
}


/// Classify one raw segment by its lexical shape.
///
/// Optionally-negative digits become an index, the three-part numeric slice
/// grammar becomes a slice and anything else is a key. Numbers too large
/// for `i64` fall back to keys.
pub fn classify(raw: &str) -> Segment {
    if INDEX_PATTERN.is_match(raw) {
        if let Ok(i) = raw.parse::<i64>() {
            return Segment::Index(i);
        }
    }

    if let Some(caps) = SLICE_PATTERN.captures(raw) {
        let part = |n: usize| match caps.get(n) {
            None => Some(None),
            Some(m) => m.as_str().parse::<i64>().ok().map(Some),
        };
        if let (Some(start), Some(stop), Some(step)) = (part(1), part(2), part(3)) {
            return Segment::Slice(SliceSpec { start, stop, step });
        }
    }

    Segment::Key(raw.to_string())
}


/// Join segments with the delimiter in canonical form.
pub fn join_path(path: &[Segment], delimiter: &str) -> String {
    path.iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(delimiter)
}


/// Resolve a possibly-negative index against a sequence length.
pub(crate) fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let i = if index < 0 { index + len } else { index };
    if (0..len).contains(&i) {
        Some(i as usize)
    } else {
        None
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
