//! Value shapes.
//!
//! Documents are plain `serde_json::Value` trees. `ValueKind` is the closed
//! tag used to decide which view applies to a value and to detect writes
//! that change a value's shape.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;


/// The shape of a document value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Mapping,
    Sequence,
    Boolean,
    Integer,
    Float,
    String,
    Null,
}

impl ValueKind {
    /// Classify a value. Signed and unsigned integers are both `Integer`.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => ValueKind::Mapping,
            Value::Array(_) => ValueKind::Sequence,
            Value::Bool(_) => ValueKind::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => ValueKind::Integer,
            Value::Number(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::Null => ValueKind::Null,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Mapping => "mapping",
            ValueKind::Sequence => "sequence",
            ValueKind::Boolean => "boolean",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Null => "null",
        }
    }

    /// True for mappings and sequences.
    pub fn is_container(&self) -> bool {
        matches!(self, ValueKind::Mapping | ValueKind::Sequence)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


/// Text used when a value is spliced into a larger string.
///
/// Strings are inserted verbatim, null becomes `None`, everything else uses
/// its compact JSON form.
pub fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_every_shape() {
        assert_eq!(ValueKind::of(&json!({"a": 1})), ValueKind::Mapping);
        assert_eq!(ValueKind::of(&json!([1, 2])), ValueKind::Sequence);
        assert_eq!(ValueKind::of(&json!(true)), ValueKind::Boolean);
        assert_eq!(ValueKind::of(&json!(-3)), ValueKind::Integer);
        assert_eq!(ValueKind::of(&json!(u64::MAX)), ValueKind::Integer);
        assert_eq!(ValueKind::of(&json!(1.5)), ValueKind::Float);
        assert_eq!(ValueKind::of(&json!("x")), ValueKind::String);
        assert_eq!(ValueKind::of(&json!(null)), ValueKind::Null);
    }

    #[test]
    fn containers() {
        assert!(ValueKind::Mapping.is_container());
        assert!(ValueKind::Sequence.is_container());
        assert!(!ValueKind::String.is_container());
    }

    #[test]
    fn kind_serde_is_snake_case() {
        let json = serde_json::to_string(&ValueKind::Mapping).unwrap();
        assert_eq!(json, "\"mapping\"");
    }

    #[test]
    fn render_scalars_and_containers() {
        assert_eq!(render(&json!("plain")), "plain");
        assert_eq!(render(&json!(123)), "123");
        assert_eq!(render(&json!(1.25)), "1.25");
        assert_eq!(render(&json!(false)), "false");
        assert_eq!(render(&json!(null)), "None");
        assert_eq!(render(&json!([1, "a"])), r#"[1,"a"]"#);
    }
}
