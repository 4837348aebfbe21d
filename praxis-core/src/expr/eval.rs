//! Expression evaluation against a run context

use serde_json::Value;

use super::error::ExprError;
use super::parser::{CmpOp, Expr};
use crate::context::Context;

impl Expr {
    /// Evaluate the expression against the current context
    ///
    /// `and`/`or` short-circuit and yield booleans; a bare reference yields
    /// the referenced value itself (callers wanting a predicate use
    /// [`Expr::eval_bool`]).
    pub fn eval(&self, ctx: &Context) -> Result<Value, ExprError> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Ref(path) => path.resolve(ctx),
            Expr::Not(inner) => Ok(Value::Bool(!is_truthy(&inner.eval(ctx)?))),
            Expr::And(lhs, rhs) => {
                if !is_truthy(&lhs.eval(ctx)?) {
                    Ok(Value::Bool(false))
                } else {
                    Ok(Value::Bool(is_truthy(&rhs.eval(ctx)?)))
                }
            }
            Expr::Or(lhs, rhs) => {
                if is_truthy(&lhs.eval(ctx)?) {
                    Ok(Value::Bool(true))
                } else {
                    Ok(Value::Bool(is_truthy(&rhs.eval(ctx)?)))
                }
            }
            Expr::Cmp { op, lhs, rhs } => compare(*op, &lhs.eval(ctx)?, &rhs.eval(ctx)?),
        }
    }

    /// Evaluate and collapse to the truthiness of the result
    pub fn eval_bool(&self, ctx: &Context) -> Result<bool, ExprError> {
        Ok(is_truthy(&self.eval(ctx)?))
    }
}

/// Check if a JSON value is "truthy"
///
/// Null, `false`, zero, the empty string, and empty collections are falsy;
/// everything else is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(arr) => !arr.is_empty(),
        Value::Object(obj) => !obj.is_empty(),
    }
}

/// Comparison semantics: numeric when both sides are numbers, string-wise
/// when both sides are strings, equality-only otherwise
fn compare(op: CmpOp, lhs: &Value, rhs: &Value) -> Result<Value, ExprError> {
    let result = match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            match op {
                CmpOp::Eq => a == b,
                CmpOp::Ne => a != b,
                CmpOp::Lt => a < b,
                CmpOp::Le => a <= b,
                CmpOp::Gt => a > b,
                CmpOp::Ge => a >= b,
            }
        }
        (Value::String(a), Value::String(b)) => match op {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
        },
        _ => {
            if op.is_ordered() {
                return Err(ExprError::TypeMismatch {
                    op: op.symbol().to_string(),
                    lhs: type_name(lhs),
                    rhs: type_name(rhs),
                });
            }
            match op {
                CmpOp::Eq => lhs == rhs,
                CmpOp::Ne => lhs != rhs,
                _ => unreachable!("ordered comparisons rejected above"),
            }
        }
    };
    Ok(Value::Bool(result))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> Context {
        let mut ctx = Context::new();
        ctx.insert(
            "s1",
            json!({"level": 14.5, "status": "CRITICAL_LOW", "breach": false, "count": 0}),
        );
        ctx.insert("s2", json!({"severity": "HIGH"}));
        ctx
    }

    #[test]
    fn test_truthiness_table() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(false)));
        assert!(is_truthy(&json!(true)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!(0.0)));
        assert!(is_truthy(&json!(1)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!("hello")));
        assert!(!is_truthy(&json!([])));
        assert!(is_truthy(&json!([1])));
        assert!(!is_truthy(&json!({})));
        assert!(is_truthy(&json!({"a": 1})));
    }

    #[test]
    fn test_bare_reference_truthiness() {
        let ctx = ctx();
        assert!(!Expr::parse("$s1.breach").unwrap().eval_bool(&ctx).unwrap());
        assert!(!Expr::parse("$s1.count").unwrap().eval_bool(&ctx).unwrap());
        assert!(Expr::parse("$s1.status").unwrap().eval_bool(&ctx).unwrap());
    }

    #[test]
    fn test_numeric_comparison() {
        let ctx = ctx();
        assert!(Expr::parse("$s1.level < 15").unwrap().eval_bool(&ctx).unwrap());
        assert!(!Expr::parse("$s1.level >= 15").unwrap().eval_bool(&ctx).unwrap());
        // integer literal against float value compares numerically
        assert!(Expr::parse("$s1.level == 14.5").unwrap().eval_bool(&ctx).unwrap());
        assert!(Expr::parse("$s1.count == 0").unwrap().eval_bool(&ctx).unwrap());
    }

    #[test]
    fn test_string_comparison() {
        let ctx = ctx();
        assert!(Expr::parse("$s2.severity == 'HIGH'").unwrap().eval_bool(&ctx).unwrap());
        assert!(Expr::parse("$s2.severity != 'LOW'").unwrap().eval_bool(&ctx).unwrap());
        // lexicographic ordering
        assert!(Expr::parse("'ALERT' < 'EVACUATE'").unwrap().eval_bool(&ctx).unwrap());
    }

    #[test]
    fn test_equality_across_types() {
        let ctx = ctx();
        assert!(!Expr::parse("$s1.breach == 'false'").unwrap().eval_bool(&ctx).unwrap());
        assert!(Expr::parse("$s1.breach != null").unwrap().eval_bool(&ctx).unwrap());
        assert!(Expr::parse("$s1.breach == false").unwrap().eval_bool(&ctx).unwrap());
    }

    #[test]
    fn test_ordered_comparison_type_mismatch() {
        let ctx = ctx();
        let err = Expr::parse("$s1.level < 'abc'").unwrap().eval_bool(&ctx).unwrap_err();
        match err {
            ExprError::TypeMismatch { op, lhs, rhs } => {
                assert_eq!(op, "<");
                assert_eq!(lhs, "number");
                assert_eq!(rhs, "string");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_boolean_connectives() {
        let ctx = ctx();
        assert!(Expr::parse("$s1.level < 15 and $s2.severity == 'HIGH'")
            .unwrap()
            .eval_bool(&ctx)
            .unwrap());
        assert!(Expr::parse("$s1.breach or $s1.level < 15")
            .unwrap()
            .eval_bool(&ctx)
            .unwrap());
        assert!(Expr::parse("not $s1.breach").unwrap().eval_bool(&ctx).unwrap());
    }

    #[test]
    fn test_short_circuit_skips_bad_reference() {
        let ctx = ctx();
        // rhs references a missing step, but the lhs decides the answer first
        assert!(!Expr::parse("$s1.breach and $s9.field")
            .unwrap()
            .eval_bool(&ctx)
            .unwrap());
        assert!(Expr::parse("$s1.status or $s9.field")
            .unwrap()
            .eval_bool(&ctx)
            .unwrap());
        // without short-circuit protection the reference error surfaces
        assert!(Expr::parse("$s1.status and $s9.field")
            .unwrap()
            .eval_bool(&ctx)
            .is_err());
    }

    #[test]
    fn test_unresolved_reference_error() {
        let ctx = ctx();
        let err = Expr::parse("$s9.level > 1").unwrap().eval_bool(&ctx).unwrap_err();
        assert_eq!(
            err,
            ExprError::UnresolvedReference {
                path: "$s9.level".to_string()
            }
        );
    }
}
