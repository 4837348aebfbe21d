//! Reference paths and eager argument resolution

use std::fmt;

use serde_json::{Map, Value};

use super::error::ExprError;
use crate::context::Context;

/// A parsed `$id(.segment)*` reference into the run context
///
/// `$s2` names the entire output of step `s2`; `$s2.level` traverses the
/// `level` key of that output. Segments only traverse map keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefPath {
    root: String,
    segments: Vec<String>,
}

impl RefPath {
    pub(crate) fn new(root: String, segments: Vec<String>) -> Self {
        Self { root, segments }
    }

    /// Parse a reference, accepting only a full-string match
    ///
    /// Returns `None` for anything that is not exactly `$ident(.ident)*`,
    /// including strings that merely begin with `$`. Such strings are
    /// treated as literals by argument resolution, never interpolated.
    pub fn parse(text: &str) -> Option<RefPath> {
        let rest = text.strip_prefix('$')?;
        let mut segments: Vec<String> = Vec::new();
        for part in rest.split('.') {
            if !is_ident(part) {
                return None;
            }
            segments.push(part.to_string());
        }
        let root = segments.remove(0);
        Some(RefPath { root, segments })
    }

    /// The step id this reference is anchored to
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Walk the context and return the referenced value
    ///
    /// Any miss along the way is an [`ExprError::UnresolvedReference`]:
    /// a root step with no committed output, a missing key, or traversal
    /// into a non-map value such as `null`.
    pub fn resolve(&self, ctx: &Context) -> Result<Value, ExprError> {
        let mut current = ctx.get(&self.root).ok_or_else(|| self.unresolved())?;
        for segment in &self.segments {
            current = current
                .as_object()
                .and_then(|map| map.get(segment))
                .ok_or_else(|| self.unresolved())?;
        }
        Ok(current.clone())
    }

    fn unresolved(&self) -> ExprError {
        ExprError::UnresolvedReference {
            path: self.to_string(),
        }
    }
}

impl fmt::Display for RefPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.root)?;
        for segment in &self.segments {
            write!(f, ".{}", segment)?;
        }
        Ok(())
    }
}

fn is_ident(part: &str) -> bool {
    let mut chars = part.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Eagerly resolve every reference in an argument mapping
///
/// A string value is a reference iff the entire string parses as one;
/// arrays and maps resolve element by element; all other literals pass
/// through unchanged. The result contains no `$` references.
pub fn resolve_args(args: &Map<String, Value>, ctx: &Context) -> Result<Map<String, Value>, ExprError> {
    args.iter()
        .map(|(name, value)| Ok((name.clone(), resolve_value(value, ctx)?)))
        .collect()
}

fn resolve_value(value: &Value, ctx: &Context) -> Result<Value, ExprError> {
    match value {
        Value::String(text) => match RefPath::parse(text) {
            Some(path) => path.resolve(ctx),
            None => Ok(value.clone()),
        },
        Value::Array(items) => items
            .iter()
            .map(|item| resolve_value(item, ctx))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => map
            .iter()
            .map(|(key, item)| Ok((key.clone(), resolve_value(item, ctx)?)))
            .collect::<Result<Map<_, _>, _>>()
            .map(Value::Object),
        other => Ok(other.clone()),
    }
}

/// Collect every reference appearing in an argument value
///
/// Used by the plan validator to check that argument references only name
/// steps declared earlier in the document.
pub(crate) fn collect_arg_refs(value: &Value, out: &mut Vec<RefPath>) {
    match value {
        Value::String(text) => {
            if let Some(path) = RefPath::parse(text) {
                out.push(path);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_arg_refs(item, out);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_arg_refs(item, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> Context {
        let mut ctx = Context::new();
        ctx.insert("s1", json!({"level": 14.5, "nested": {"unit": "percent"}}));
        ctx.insert("s2", json!(null));
        ctx
    }

    #[test]
    fn test_parse_full_match() {
        let path = RefPath::parse("$s1.data.value").unwrap();
        assert_eq!(path.root(), "s1");
        assert_eq!(path.to_string(), "$s1.data.value");
    }

    #[test]
    fn test_parse_rejects_non_references() {
        assert!(RefPath::parse("s1.level").is_none());
        assert!(RefPath::parse("$").is_none());
        assert!(RefPath::parse("$s1.").is_none());
        assert!(RefPath::parse("$s1 level").is_none());
        assert!(RefPath::parse("$1bad").is_none());
        assert!(RefPath::parse("not $s1").is_none());
    }

    #[test]
    fn test_resolve_whole_output() {
        let value = RefPath::parse("$s1").unwrap().resolve(&ctx()).unwrap();
        assert_eq!(value["level"], json!(14.5));
    }

    #[test]
    fn test_resolve_nested_path() {
        let value = RefPath::parse("$s1.nested.unit").unwrap().resolve(&ctx()).unwrap();
        assert_eq!(value, json!("percent"));
    }

    #[test]
    fn test_resolve_missing_root() {
        let err = RefPath::parse("$s9").unwrap().resolve(&ctx()).unwrap_err();
        assert_eq!(
            err,
            ExprError::UnresolvedReference {
                path: "$s9".to_string()
            }
        );
    }

    #[test]
    fn test_resolve_missing_key() {
        let err = RefPath::parse("$s1.oxygen").unwrap().resolve(&ctx()).unwrap_err();
        assert!(matches!(err, ExprError::UnresolvedReference { .. }));
    }

    #[test]
    fn test_resolve_through_null_fails() {
        // s2 committed null; any field beneath it is unresolvable
        let err = RefPath::parse("$s2.field").unwrap().resolve(&ctx()).unwrap_err();
        assert!(matches!(err, ExprError::UnresolvedReference { .. }));
    }

    #[test]
    fn test_resolve_args_mixed() {
        let args = json!({
            "o2_level": "$s1.level",
            "label": "plain string",
            "broken_looking": "$s1 is fine",
            "nested": {"unit": "$s1.nested.unit"},
            "list": ["$s1.level", 42]
        });
        let resolved = resolve_args(args.as_object().unwrap(), &ctx()).unwrap();

        assert_eq!(resolved["o2_level"], json!(14.5));
        assert_eq!(resolved["label"], json!("plain string"));
        // begins with '$' but is not entirely a reference: literal
        assert_eq!(resolved["broken_looking"], json!("$s1 is fine"));
        assert_eq!(resolved["nested"], json!({"unit": "percent"}));
        assert_eq!(resolved["list"], json!([14.5, 42]));
    }

    #[test]
    fn test_resolve_args_missing_reference() {
        let args = json!({"value": "$s1.absent"});
        let err = resolve_args(args.as_object().unwrap(), &ctx()).unwrap_err();
        assert!(matches!(err, ExprError::UnresolvedReference { .. }));
    }

    #[test]
    fn test_collect_arg_refs() {
        let args = json!({
            "a": "$s1.level",
            "b": {"c": ["$s2", "literal"]}
        });
        let mut refs = Vec::new();
        collect_arg_refs(&args, &mut refs);

        let mut roots: Vec<&str> = refs.iter().map(|r| r.root()).collect();
        roots.sort();
        assert_eq!(roots, vec!["s1", "s2"]);
    }
}
