//! Pre-run plan validation

use std::collections::HashSet;

use thiserror::Error;

use super::schema::{Plan, Step};
use crate::expr::{Expr, ExprError, RefPath};
use crate::tools::ToolRegistry;

/// Error type for plan validation
///
/// Raised before any event is emitted; a run never starts on an invalid
/// plan.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    /// The step list is empty
    #[error("plan has no steps")]
    EmptyPlan,

    /// A step id is empty or blank
    #[error("step at index {index} has an empty id")]
    EmptyStepId {
        /// Zero-based position in the document
        index: usize,
    },

    /// Two steps share an id
    #[error("duplicate step id '{id}'")]
    DuplicateStepId { id: String },

    /// A step names a tool absent from the registry
    #[error("step '{step}' names unknown tool '{tool}'")]
    UnknownTool { step: String, tool: String },

    /// A reference names a step id not declared earlier in the document
    #[error("step '{step}' references '{reference}', which is not declared earlier in the plan")]
    UndeclaredReference { step: String, reference: String },

    /// A guard or escalation expression failed to parse
    #[error("step '{step}': {source}")]
    InvalidExpression {
        step: String,
        #[source]
        source: ExprError,
    },
}

/// Validate a plan against a registry
///
/// Checks are purely syntactic and reference-shaped: the step list is
/// non-empty, ids are unique and non-blank, every tool resolves, every
/// expression parses, and every reference names a step declared earlier in
/// the document (an `intervention_if` may also reference its own step).
/// Expressions are never evaluated here.
pub fn validate(plan: &Plan, registry: &ToolRegistry) -> Result<(), ValidationError> {
    if plan.steps.is_empty() {
        return Err(ValidationError::EmptyPlan);
    }

    let mut declared: HashSet<&str> = HashSet::new();

    for (index, step) in plan.steps.iter().enumerate() {
        if step.id.trim().is_empty() {
            return Err(ValidationError::EmptyStepId { index });
        }
        if declared.contains(step.id.as_str()) {
            return Err(ValidationError::DuplicateStepId {
                id: step.id.clone(),
            });
        }
        if !registry.contains(&step.tool) {
            return Err(ValidationError::UnknownTool {
                step: step.id.clone(),
                tool: step.tool.clone(),
            });
        }

        check_args(step, &declared)?;
        if let Some(source) = &step.run_if {
            check_expression(step, source, &declared, false)?;
        }
        if let Some(source) = &step.intervention_if {
            // evaluated after the step commits, so its own output is in scope
            check_expression(step, source, &declared, true)?;
        }

        declared.insert(step.id.as_str());
    }

    Ok(())
}

fn check_args(step: &Step, declared: &HashSet<&str>) -> Result<(), ValidationError> {
    let Some(args) = &step.args else {
        return Ok(());
    };

    let mut refs: Vec<RefPath> = Vec::new();
    for value in args.values() {
        crate::expr::collect_arg_refs(value, &mut refs);
    }
    for reference in refs {
        if !declared.contains(reference.root()) {
            return Err(ValidationError::UndeclaredReference {
                step: step.id.clone(),
                reference: reference.to_string(),
            });
        }
    }
    Ok(())
}

fn check_expression(
    step: &Step,
    source: &str,
    declared: &HashSet<&str>,
    own_step_in_scope: bool,
) -> Result<(), ValidationError> {
    let expr = Expr::parse(source).map_err(|err| ValidationError::InvalidExpression {
        step: step.id.clone(),
        source: err,
    })?;

    for reference in expr.references() {
        let in_scope = declared.contains(reference.root())
            || (own_step_in_scope && reference.root() == step.id);
        if !in_scope {
            return Err(ValidationError::UndeclaredReference {
                step: step.id.clone(),
                reference: reference.to_string(),
            });
        }
    }
    Ok(())
}
