//! # Praxis - Streaming Tool-Chain Execution
//!
//! Praxis (πρᾶξις) is the execution substrate behind a "skills" abstraction:
//! it takes a declarative plan describing an ordered sequence of named tool
//! invocations, resolves data dependencies between steps, evaluates guard
//! and escalation predicates, invokes tools (synchronous or asynchronous),
//! and emits a live stream of structured events describing progress.
//!
//! The engine is pure with respect to its inputs: the plan and registry are
//! read-only, the run context is owned by one run, and nothing persists
//! across runs. Agents, transports, LLM adapters, and UIs are external
//! collaborators that supply plans and tools and consume the event stream.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use praxis_core::prelude::*;
//! use serde_json::json;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> praxis_core::Result<()> {
//!     let mut registry = ToolRegistry::new();
//!     registry.register_fn("check_oxygen", |_args| {
//!         Ok(json!({"level": 14.5, "status": "CRITICAL_LOW"}))
//!     })?;
//!     registry.register_fn("analyze_atmosphere", |args| {
//!         let severity = match args["o2_level"].as_f64() {
//!             Some(level) if level < 15.0 => "HIGH",
//!             Some(_) => "LOW",
//!             None => "UNKNOWN",
//!         };
//!         Ok(json!({"severity": severity}))
//!     })?;
//!
//!     let plan = Plan::from_json(r#"{
//!         "id": "oxygen_audit",
//!         "steps": [
//!             {"id": "s1", "tool": "check_oxygen", "key_finding": true},
//!             {
//!                 "id": "s2",
//!                 "tool": "analyze_atmosphere",
//!                 "args": {"o2_level": "$s1.level"},
//!                 "intervention_if": "$s2.severity == 'HIGH'"
//!             }
//!         ]
//!     }"#)?;
//!
//!     let executor = Executor::new(Arc::new(registry));
//!     let result = executor.run_to_end(plan, CancellationToken::new()).await?;
//!
//!     println!("{} after {} steps", result.verdict, result.steps_completed);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Plan schema & validator**: the plan document and its pre-run checks;
//!   a validated plan cannot hit unknown-tool or reference-shape errors at
//!   runtime
//! - **Expression sub-language**: hand-rolled `$step.path` references and
//!   the restricted guard grammar, evaluated without any general-purpose
//!   interpreter
//! - **Tool registry**: named synchronous and asynchronous invocables
//! - **Executor**: the streaming interpreter with cooperative cancellation
//! - **Events**: the ordered stream and the materialized result

pub mod context;
pub mod error;
pub mod events;
pub mod executor;
pub mod expr;
pub mod plan;
pub mod tools;

pub use error::{PraxisError, Result};

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::context::Context;
    pub use crate::error::{PraxisError, Result};
    pub use crate::events::{ErrorKind, Event, EventKind, ExecutionResult, Verdict};
    pub use crate::executor::{EventStream, Executor, ExecutorConfig};
    pub use crate::expr::{is_truthy, CmpOp, Expr, ExprError, RefPath};
    pub use crate::plan::{validate, Plan, SkillTriggers, Step, ValidationError};
    pub use crate::tools::{
        AsyncTool, RegistryError, SyncToolFn, ToolEntry, ToolError, ToolRegistry, ToolSummary,
    };
}
