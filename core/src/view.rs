//! Typed views over handles.
//!
//! One variant per [`ValueKind`]. A view only forwards the handful of
//! operations callers need (length, lookup, iteration, membership, scalar
//! access, comparison) and always works on the stored value, not the
//! template-resolved one. Every operation goes through the handle, so an
//! invalidated handle makes its view fail with `Error::InvalidReference`.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::address::{Query, Segment};
use crate::error::{Error, Result};
use crate::handle::Handle;
use crate::value::ValueKind;


#[derive(Debug, Clone)]
pub enum View {
    Mapping(Handle),
    Sequence(Handle),
    Boolean(Handle),
    Integer(Handle),
    Float(Handle),
    String(Handle),
    Null(Handle),
}

impl View {
    /// The view matching the handle's current value.
    pub fn of(handle: &Handle) -> Result<Self> {
        let handle = handle.clone();
        Ok(match handle.kind()? {
            ValueKind::Mapping => View::Mapping(handle),
            ValueKind::Sequence => View::Sequence(handle),
            ValueKind::Boolean => View::Boolean(handle),
            ValueKind::Integer => View::Integer(handle),
            ValueKind::Float => View::Float(handle),
            ValueKind::String => View::String(handle),
            ValueKind::Null => View::Null(handle),
        })
    }

    /// A sequence view. Null is accepted and behaves as an empty sequence.
    pub fn sequence(handle: &Handle) -> Result<Self> {
        View::expect(handle, ValueKind::Sequence)
    }

    /// A mapping view. Null is accepted and behaves as an empty mapping.
    pub fn mapping(handle: &Handle) -> Result<Self> {
        View::expect(handle, ValueKind::Mapping)
    }

    fn expect(handle: &Handle, expected: ValueKind) -> Result<Self> {
        match handle.kind()? {
            found if found == expected || found == ValueKind::Null => View::of(handle),
            found => Err(Error::TypeConversion { expected, found }),
        }
    }

    pub fn handle(&self) -> &Handle {
        match self {
            View::Mapping(h)
            | View::Sequence(h)
            | View::Boolean(h)
            | View::Integer(h)
            | View::Float(h)
            | View::String(h)
            | View::Null(h) => h,
        }
    }

    fn tag(&self) -> ValueKind {
        match self {
            View::Mapping(_) => ValueKind::Mapping,
            View::Sequence(_) => ValueKind::Sequence,
            View::Boolean(_) => ValueKind::Boolean,
            View::Integer(_) => ValueKind::Integer,
            View::Float(_) => ValueKind::Float,
            View::String(_) => ValueKind::String,
            View::Null(_) => ValueKind::Null,
        }
    }

    /// Current raw value, after checking the handle is live.
    fn value(&self) -> Result<Value> {
        self.handle().raw_value()
    }

    fn mismatch(&self, expected: ValueKind) -> Error {
        Error::TypeConversion {
            expected,
            found: self.tag(),
        }
    }

    pub fn kind(&self) -> Result<ValueKind> {
        self.handle().kind()
    }

    // -- containers ---------------------------------------------------------

    /// Element count for containers, character count for strings.
    pub fn len(&self) -> Result<usize> {
        match self.value()? {
            Value::Object(map) => Ok(map.len()),
            Value::Array(items) => Ok(items.len()),
            Value::String(s) => Ok(s.chars().count()),
            Value::Null => Ok(0),
            _ => Err(self.mismatch(ValueKind::Sequence)),
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Handle for a key or index below this value.
    pub fn get<'a>(&self, query: impl Into<Query<'a>>) -> Result<Option<Handle>> {
        match self {
            View::Mapping(h) | View::Sequence(h) => h.get(query),
            View::Null(h) => h.raw_value().map(|_| None),
            _ => Err(self.mismatch(ValueKind::Mapping)),
        }
    }

    /// Handles for every element or entry, in order. They come from the
    /// document cache, so they are the same handles direct lookups return.
    pub fn children(&self) -> Result<Vec<Handle>> {
        let segments: Vec<Segment> = match self.value()? {
            Value::Array(items) => (0..items.len()).map(|i| Segment::Index(i as i64)).collect(),
            Value::Object(map) => map.keys().cloned().map(Segment::Key).collect(),
            Value::Null => Vec::new(),
            _ => return Err(self.mismatch(ValueKind::Sequence)),
        };
        let handle = self.handle();
        let mut out = Vec::with_capacity(segments.len());
        for segment in segments {
            out.extend(handle.child(segment)?);
        }
        Ok(out)
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        match self.value()? {
            Value::Object(map) => Ok(map.keys().cloned().collect()),
            Value::Null => Ok(Vec::new()),
            _ => Err(self.mismatch(ValueKind::Mapping)),
        }
    }

    /// Membership: an element of a sequence, a key of a mapping, or a
    /// substring of a string.
    pub fn contains(&self, needle: &Value) -> Result<bool> {
        match (self.value()?, needle) {
            (Value::Array(items), _) => Ok(items.iter().any(|v| values_equal(v, needle))),
            (Value::Object(map), Value::String(key)) => Ok(map.contains_key(key)),
            (Value::Object(_), _) => Ok(false),
            (Value::String(s), Value::String(part)) => Ok(s.contains(part.as_str())),
            (Value::String(_), _) => Ok(false),
            (Value::Null, _) => Ok(false),
            _ => Err(self.mismatch(ValueKind::Sequence)),
        }
    }

    /// Append to a sequence in place.
    pub fn push(&self, value: Value) -> Result<()> {
        match self.value()? {
            Value::Array(mut items) => {
                items.push(value);
                self.handle().set_raw_value(Value::Array(items))
            }
            _ => Err(self.mismatch(ValueKind::Sequence)),
        }
    }

    /// Insert or replace a mapping entry, returning the previous value.
    pub fn insert(&self, key: &str, value: Value) -> Result<Option<Value>> {
        let previous = match self.value()? {
            Value::Object(map) => map.get(key).cloned(),
            _ => return Err(self.mismatch(ValueKind::Mapping)),
        };
        self.handle().write_child(Segment::Key(key.to_string()), value)?;
        Ok(previous)
    }

    /// Remove a mapping entry if present.
    pub fn remove(&self, key: &str) -> Result<Option<Value>> {
        match self.value()? {
            Value::Object(map) if map.contains_key(key) => {
                self.handle().delete_child(Segment::Key(key.to_string())).map(Some)
            }
            Value::Object(_) => Ok(None),
            _ => Err(self.mismatch(ValueKind::Mapping)),
        }
    }

    // -- scalars ------------------------------------------------------------

    pub fn as_bool(&self) -> Result<bool> {
        self.value()?
            .as_bool()
            .ok_or_else(|| self.mismatch(ValueKind::Boolean))
    }

    pub fn as_i64(&self) -> Result<i64> {
        self.value()?
            .as_i64()
            .ok_or_else(|| self.mismatch(ValueKind::Integer))
    }

    /// Integers widen to floats.
    pub fn as_f64(&self) -> Result<f64> {
        self.value()?
            .as_f64()
            .ok_or_else(|| self.mismatch(ValueKind::Float))
    }

    pub fn as_str(&self) -> Result<String> {
        match self.value()? {
            Value::String(s) => Ok(s),
            _ => Err(self.mismatch(ValueKind::String)),
        }
    }

    // -- comparison ---------------------------------------------------------

    /// Equality against a plain value. Integers and floats compare by
    /// numeric value.
    pub fn eq_value(&self, other: &Value) -> Result<bool> {
        Ok(values_equal(&self.value()?, other))
    }

    /// Ordering against a plain value, where one exists. Numbers order
    /// numerically, strings and booleans naturally, sequences
    /// lexicographically; mappings and mixed kinds are unordered.
    pub fn partial_cmp_value(&self, other: &Value) -> Result<Option<Ordering>> {
        Ok(compare(&self.value()?, other))
    }
}


fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => maps_equal(xs, ys),
        _ => a == b,
    }
}

fn maps_equal(xs: &Map<String, Value>, ys: &Map<String, Value>) -> bool {
    xs.len() == ys.len()
        && xs
            .iter()
            .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Array(xs), Value::Array(ys)) => {
            for (x, y) in xs.iter().zip(ys) {
                match compare(x, y)? {
                    Ordering::Equal => continue,
                    other => return Some(other),
                }
            }
            Some(xs.len().cmp(&ys.len()))
        }
        _ => None,
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
