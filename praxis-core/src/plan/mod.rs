//! Plan schema and pre-run validation
//!
//! A plan is a declarative JSON document: an ordered, non-empty sequence of
//! named tool invocations with optional guards, escalations, and argument
//! references into earlier step outputs. A plan that also carries usage
//! guidance (`when_to_use`, triggers, fallbacks) doubles as a saved skill
//! for agent consumers; the executor ignores that metadata entirely.
//!
//! Validation runs once, before any event is emitted. A plan that passes
//! [`validate`] cannot produce unknown-tool or reference-shape errors at
//! runtime; tool-runtime and value-shape errors remain possible.

mod schema;
mod validate;

pub use schema::{Plan, SkillTriggers, Step};
pub use validate::{validate, ValidationError};
