//! Reference templates embedded in string values.
//!
//! Grammar (method letters are case-insensitive, as are query characters):
//!
//! ```text
//! template  = { text | reference } ;
//! reference = "$" method "{" query "}" ;
//! method    = "r" | "e" ;
//! query     = qchar { qchar } ;
//! qchar     = letter | digit | "_" | "/" | "." ;
//! ```
//!
//! `$r{address}` is replaced by the value at `address`, resolved from the
//! document root. `$e{NAME}` is replaced by the environment variable `NAME`,
//! or the text `None` when it is unset.
//!
//! A string that consists of exactly one reference (surrounding whitespace
//! aside) is replaced by the referenced value itself, keeping its type.
//! Otherwise every reference found in the input string is spliced in as
//! text, left to right; substituted text is not scanned again.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::trace;

use crate::address::{join_path, Address, Segment};
use crate::context::Context;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::resolver;
use crate::value::render;

static REFERENCE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\$(r|e)\{([a-z0-9_/.]+)\}").unwrap());


/// Which substitution a reference asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `$r{...}`, a document address.
    Reference,
    /// `$e{...}`, an environment variable.
    Environment,
}


/// One reference found in a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub method: Method,
    pub query: String,
    pub span: Range<usize>,
}


/// Find every reference in `text`, in order of appearance.
pub fn scan(text: &str) -> Vec<Reference> {
    REFERENCE_PATTERN
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let method = match caps.get(1)?.as_str() {
                "r" | "R" => Method::Reference,
                _ => Method::Environment,
            };
            Some(Reference {
                method,
                query: caps.get(2)?.as_str().to_string(),
                span: whole.range(),
            })
        })
        .collect()
}

/// Address queries of all `$r{...}` references in `text`.
pub fn extract(text: &str) -> Vec<String> {
    scan(text)
        .into_iter()
        .filter(|r| r.method == Method::Reference)
        .map(|r| r.query)
        .collect()
}


/// Expand every template in `value` against `document`.
pub fn resolve(document: &Document, value: &Value) -> Result<Value> {
    Expander::new(document).expand(value)
}

/// Like [`resolve`], for a value that lives at `origin` in the document. A
/// reference back to `origin` is reported as a cycle right away.
pub fn resolve_from(document: &Document, value: &Value, origin: &[Segment]) -> Result<Value> {
    let mut expander = Expander::new(document);
    expander.active.push(join_path(origin, document.delimiter()));
    expander.expand(value)
}


struct Expander<'d> {
    document: &'d Document,
    /// Canonical addresses currently being expanded, outermost first.
    active: Vec<String>,
}

impl<'d> Expander<'d> {
    fn new(document: &'d Document) -> Self {
        Expander {
            document,
            active: Vec::new(),
        }
    }

    fn expand(&mut self, value: &Value) -> Result<Value> {
        match value {
            Value::Object(map) => {
                let mut out = Map::new();
                for (k, v) in map {
                    out.insert(k.clone(), self.expand(v)?);
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => items
                .iter()
                .map(|v| self.expand(v))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Value::String(text) => self.expand_text(text),
            other => Ok(other.clone()),
        }
    }

    fn expand_text(&mut self, text: &str) -> Result<Value> {
        let references = scan(text);
        if references.is_empty() {
            return Ok(Value::String(text.to_string()));
        }

        if let [only] = references.as_slice() {
            if text.trim() == &text[only.span.clone()] {
                return self.substitute(only);
            }
        }

        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for reference in &references {
            out.push_str(&text[cursor..reference.span.start]);
            out.push_str(&render(&self.substitute(reference)?));
            cursor = reference.span.end;
        }
        out.push_str(&text[cursor..]);
        Ok(Value::String(out))
    }

    fn substitute(&mut self, reference: &Reference) -> Result<Value> {
        match reference.method {
            Method::Environment => {
                let value = std::env::var(&reference.query).unwrap_or_else(|_| "None".to_string());
                trace!(name = %reference.query, "substituted environment variable");
                Ok(Value::String(value))
            }
            Method::Reference => self.dereference(&reference.query),
        }
    }

    fn dereference(&mut self, query: &str) -> Result<Value> {
        let document = self.document;
        let delimiter = document.delimiter();
        let address = Address::parse(query, delimiter);
        let context = Context::root(delimiter);
        let canonical = address.canonical(context.path());
        if self.active.contains(&canonical) {
            return Err(Error::ReferenceCycle(canonical));
        }

        let handles = resolver::resolve(document, &address, &context, document.settings().use_cache);
        let raw = match handles.as_slice() {
            [] => {
                trace!(address = %canonical, "reference did not resolve");
                return Ok(Value::Null);
            }
            [one] => one.raw_value()?,
            many => Value::Array(
                many.iter()
                    .map(|h| h.raw_value())
                    .collect::<Result<Vec<_>>>()?,
            ),
        };

        self.active.push(canonical);
        let expanded = self.expand(&raw);
        self.active.pop();
        expanded
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
    fn scan_finds_both_methods_case_insensitively() {
        let refs = scan("a $r{x/y} b $E{HOME} c $R{Z.1}");
        assert_eq!(refs.len(), 3);
        assert_eq!(refs[0].method, Method::Reference);
        assert_eq!(refs[0].query, "x/y");
        assert_eq!(refs[0].span, 2..9);
        assert_eq!(refs[1].method, Method::Environment);
        assert_eq!(refs[1].query, "HOME");
        assert_eq!(refs[2].method, Method::Reference);
        assert_eq!(refs[2].query, "Z.1");
    }

    #[test]
    fn scan_ignores_characters_outside_the_grammar() {
        assert!(scan("$r{list/-1}").is_empty());
        assert!(scan("$r{}").is_empty());
        assert!(scan("$x{a}").is_empty());
        assert!(scan("r{a}").is_empty());
    }

    #[test]
    fn extract_returns_reference_queries_only() {
        assert_eq!(extract("$r{a} $e{B} $r{c/d}"), vec!["a", "c/d"]);
    }

    #[test]
    fn typed_pass_through() {
        let doc = Document::new(json!({"a": 123, "b": "$r{a}"}));
        assert_eq!(resolve(&doc, &json!("$r{a}")).unwrap(), json!(123));
        assert_eq!(resolve(&doc, &json!("  $r{a} ")).unwrap(), json!(123));
    }

    #[test]
    fn pass_through_keeps_containers() {
        let doc = Document::new(json!({"dict": {"k": "v"}, "list": [1, 2]}));
        assert_eq!(resolve(&doc, &json!("$r{dict}")).unwrap(), json!({"k": "v"}));
        assert_eq!(resolve(&doc, &json!("$r{list}")).unwrap(), json!([1, 2]));
    }

    #[test]
    fn partial_substitution() {
        let doc = Document::new(json!({"a": "X", "n": 7}));
        assert_eq!(
            resolve(&doc, &json!("pre-$r{a}-post")).unwrap(),
            json!("pre-X-post")
        );
        assert_eq!(
            resolve(&doc, &json!("$r{a}$r{n}$r{a}")).unwrap(),
            json!("X7X")
        );
    }

    #[test]
    fn substituted_text_is_not_rescanned() {
        let doc = Document::new(json!({"a": "$r{b}", "b": "B", "raw": "literal $r{b}"}));
        // `a` itself expands, because the referenced value goes through the
        // template engine; text produced by splicing does not.
        assert_eq!(resolve(&doc, &json!("<$r{a}>")).unwrap(), json!("<B>"));
        let doc = Document::new(json!({"dollar": "$", "b": "B"}));
        assert_eq!(resolve(&doc, &json!("$r{dollar}r{b}")).unwrap(), json!("$r{b}"));
    }

    #[test]
    fn nested_references_resolve_through_chains() {
        let doc = Document::new(json!({"a": 1, "b": "$r{a}", "c": "$r{b}"}));
        assert_eq!(resolve(&doc, &json!("$r{c}")).unwrap(), json!(1));
    }

    #[test]
    fn nested_paths_and_containers_recurse() {
        let doc = Document::new(json!({"app": {"name": "demo", "tags": ["t1", "t2"]}}));
        let input = json!({
            "title": "$r{app/name}",
            "first": ["$r{app/tags/0}", 5, null],
            "label": "[$r{app/name}]"
        });
        assert_eq!(
            resolve(&doc, &input).unwrap(),
            json!({"title": "demo", "first": ["t1", 5, null], "label": "[demo]"})
        );
    }

    #[test]
    fn missing_reference_is_null_or_none() {
        let doc = Document::new(json!({}));
        assert_eq!(resolve(&doc, &json!("$r{nope}")).unwrap(), json!(null));
        assert_eq!(resolve(&doc, &json!("x=$r{nope}")).unwrap(), json!("x=None"));
    }

    #[test]
    fn environment_substitution() {
        std::env::set_var("REFLECTIVE_TEMPLATE_TEST_VAR", "from-env");
        let doc = Document::new(json!({}));
        assert_eq!(
            resolve(&doc, &json!("$e{REFLECTIVE_TEMPLATE_TEST_VAR}")).unwrap(),
            json!("from-env")
        );
        assert_eq!(
            resolve(&doc, &json!("v=$e{REFLECTIVE_TEMPLATE_TEST_VAR}!")).unwrap(),
            json!("v=from-env!")
        );
        std::env::remove_var("REFLECTIVE_TEMPLATE_TEST_VAR");
    }

    #[test]
    fn unset_environment_variable_is_none_text() {
        let doc = Document::new(json!({}));
        assert_eq!(
            resolve(&doc, &json!("$e{REFLECTIVE_SURELY_UNSET_VAR_42}")).unwrap(),
            json!("None")
        );
    }

    #[test]
    fn slice_reference_yields_sequence() {
        let doc = Document::new(json!({"list": [10, 20, 30, 40]}));
        // Slice syntax is outside the template grammar, but a sequence
        // reference still comes back typed.
        assert_eq!(resolve(&doc, &json!("$r{list}")).unwrap(), json!([10, 20, 30, 40]));
    }

    #[test]
    fn cycles_are_reported() {
        let doc = Document::new(json!({"a": "$r{b}", "b": "$r{a}"}));
        let err = resolve(&doc, &json!("$r{a}")).unwrap_err();
        assert!(matches!(err, Error::ReferenceCycle(_)));
    }

    #[test]
    fn self_reference_from_origin_is_a_cycle() {
        let doc = Document::new(json!({"a": "$r{a}"}));
        let origin = vec![Segment::Key("a".into())];
        let err = resolve_from(&doc, &json!("$r{a}"), &origin).unwrap_err();
        assert!(matches!(err, Error::ReferenceCycle(ref p) if p == "a"));
    }

    #[test]
    fn repeated_reference_is_not_a_cycle() {
        let doc = Document::new(json!({"a": 1, "pair": ["$r{a}", "$r{a}"]}));
        assert_eq!(resolve(&doc, &json!("$r{pair}")).unwrap(), json!([1, 1]));
    }

    #[test]
    fn non_strings_pass_unchanged() {
        let doc = Document::new(json!({}));
        for v in [json!(1), json!(2.5), json!(true), json!(null)] {
            assert_eq!(resolve(&doc, &v).unwrap(), v);
        }
    }
}
