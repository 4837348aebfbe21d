//! Expression error type

use thiserror::Error;

/// Error type for expression parsing, reference resolution, and evaluation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    /// Expression text does not match the grammar
    #[error("invalid expression '{expression}': {message}")]
    Parse {
        /// The full expression text as written in the plan
        expression: String,
        /// What the parser choked on
        message: String,
    },

    /// A `$` reference named a path that is not present in the context
    ///
    /// This covers both a root step id with no committed output (skipped,
    /// errored, or not yet run) and a missing key along the dotted path.
    #[error("unresolved reference '{path}'")]
    UnresolvedReference {
        /// The full reference text, e.g. `$s2.level`
        path: String,
    },

    /// An ordered comparison was applied across incompatible types
    #[error("cannot compare {lhs} with {rhs} using '{op}'")]
    TypeMismatch {
        /// Operator symbol as written
        op: String,
        /// Type name of the left operand
        lhs: &'static str,
        /// Type name of the right operand
        rhs: &'static str,
    },
}

impl ExprError {
    pub(crate) fn parse(expression: impl Into<String>, message: impl Into<String>) -> Self {
        ExprError::Parse {
            expression: expression.into(),
            message: message.into(),
        }
    }
}
