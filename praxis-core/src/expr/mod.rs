//! The guard/escalation expression sub-language
//!
//! Two surfaces share one parser:
//! - `$step.path` references inside step arguments, resolved eagerly
//!   against the run context before a tool is called
//! - the restricted boolean/comparison grammar used by `run_if` and
//!   `intervention_if`
//!
//! The grammar is deliberately tiny: references, literals, the six
//! comparison operators, `and`/`or`/`not`, and parentheses. No function
//! calls, no arithmetic, no indexing beyond dotted paths, no side effects.
//! It is hand-rolled rather than delegated to a general-purpose
//! interpreter, which keeps guard evaluation statically checkable and
//! free of interpreter escapes.
//!
//! # Example
//!
//! ```rust
//! use praxis_core::context::Context;
//! use praxis_core::expr::Expr;
//! use serde_json::json;
//!
//! let mut ctx = Context::new();
//! ctx.insert("s1", json!({"level": 14.5}));
//!
//! let guard = Expr::parse("$s1.level < 15").unwrap();
//! assert!(guard.eval_bool(&ctx).unwrap());
//! ```

mod error;
mod eval;
mod parser;
mod path;

pub use error::ExprError;
pub use eval::is_truthy;
pub use parser::{CmpOp, Expr};
pub use path::{resolve_args, RefPath};

pub(crate) use path::collect_arg_refs;
