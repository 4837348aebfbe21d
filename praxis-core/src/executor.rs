//! The streaming plan executor
//!
//! The executor validates a plan against a registry, then drives it step by
//! step on a spawned task: evaluating guards, resolving argument references
//! against the accumulated context, dispatching tools (awaiting asynchronous
//! ones to completion before the next step is considered), enforcing
//! escalation predicates, and emitting a totally ordered event stream that
//! ends with exactly one `Finish`.
//!
//! Events flow through a bounded channel, so a slow consumer back-pressures
//! the run; nothing is buffered beyond the channel capacity. Cancellation is
//! checked at every step boundary, and in-flight asynchronous tools are
//! raced against the token.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use futures::Stream;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::context::Context;
use crate::events::{ErrorKind, Event, EventKind, ExecutionResult, Verdict};
use crate::expr::{resolve_args, Expr, ExprError};
use crate::plan::{validate, Plan, ValidationError};
use crate::tools::{ToolEntry, ToolError, ToolRegistry};

/// The lazy, finite event sequence produced by one run
pub type EventStream = Pin<Box<dyn Stream<Item = Event> + Send>>;

/// Configuration for the executor
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Capacity of the event channel; a full channel suspends the run until
    /// the consumer catches up. The default of 1 keeps the run in lock-step
    /// with the consumer.
    pub event_buffer: usize,
    /// Whether to emit verbose logging
    pub verbose: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            event_buffer: 1,
            verbose: false,
        }
    }
}

impl ExecutorConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the event channel capacity
    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }

    /// Enable/disable verbose logging
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Streaming interpreter for validated plans
///
/// The registry is shared, read-only input; each run owns its own context
/// and shares nothing with concurrent runs.
#[derive(Debug, Clone)]
pub struct Executor {
    registry: Arc<ToolRegistry>,
    config: ExecutorConfig,
}

impl Executor {
    /// Create an executor over a registry
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            config: ExecutorConfig::default(),
        }
    }

    /// Set the executor configuration
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the registry this executor dispatches against
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Validate the plan and start a run, returning the live event stream
    ///
    /// Validation failures are returned before any event exists. The stream
    /// yields events one at a time in emission order and terminates after
    /// the single `Finish` event.
    pub fn run(
        &self,
        plan: Plan,
        cancel: CancellationToken,
    ) -> Result<EventStream, ValidationError> {
        validate(&plan, &self.registry)?;

        let (tx, rx) = mpsc::channel(self.config.event_buffer.max(1));
        let registry = Arc::clone(&self.registry);
        let verbose = self.config.verbose;

        tokio::spawn(async move {
            drive(plan, registry, cancel, tx, verbose).await;
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    /// Run the plan to completion and materialize the result
    ///
    /// Convenience facade for callers that do not want the stream: drains
    /// every event and returns the `Finish` payload plus the full ordered
    /// event list.
    pub async fn run_to_end(
        &self,
        plan: Plan,
        cancel: CancellationToken,
    ) -> Result<ExecutionResult, ValidationError> {
        let mut stream = self.run(plan, cancel)?;
        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            events.push(event);
        }
        Ok(ExecutionResult::from_events(events))
    }
}

/// Mutable state of one run, owned by the driving task
struct RunState {
    run_id: Uuid,
    started: Instant,
    context: Context,
    key_findings: Vec<String>,
    steps_completed: usize,
}

impl RunState {
    fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started: Instant::now(),
            context: Context::new(),
            key_findings: Vec::new(),
            steps_completed: 0,
        }
    }

    fn finish(
        &self,
        verdict: Verdict,
        first_error: Option<String>,
        intervention_trigger: Option<String>,
    ) -> Event {
        Event::new(EventKind::Finish {
            run_id: self.run_id,
            verdict,
            context_snapshot: self.context.snapshot(),
            key_findings: self.key_findings.clone(),
            steps_completed: self.steps_completed,
            total_duration_ms: self.started.elapsed().as_millis() as u64,
            first_error,
            intervention_trigger,
        })
    }
}

/// Send one event; a closed channel means the consumer is gone and the run
/// stops quietly
async fn emit(tx: &mpsc::Sender<Event>, event: Event) -> bool {
    tx.send(event).await.is_ok()
}

/// Emit the `Error` + `Finish(Failure)` pair for a terminal step error
async fn fail(
    tx: &mpsc::Sender<Event>,
    state: &RunState,
    step_id: &str,
    kind: ErrorKind,
    message: String,
    cause: Option<String>,
) {
    if !emit(
        tx,
        Event::error(Some(step_id.to_string()), kind, message, cause),
    )
    .await
    {
        return;
    }
    let _ = emit(
        tx,
        state.finish(Verdict::Failure, Some(step_id.to_string()), None),
    )
    .await;
}

/// Emit the `Error(Cancelled)` + `Finish(Cancelled)` pair
async fn cancelled(tx: &mpsc::Sender<Event>, state: &RunState, step_id: &str, message: &str) {
    if !emit(
        tx,
        Event::error(
            Some(step_id.to_string()),
            ErrorKind::Cancelled,
            message,
            None,
        ),
    )
    .await
    {
        return;
    }
    let _ = emit(tx, state.finish(Verdict::Cancelled, None, None)).await;
}

fn evaluate_predicate(source: &str, ctx: &Context) -> Result<bool, ExprError> {
    Expr::parse(source)?.eval_bool(ctx)
}

enum Invocation {
    Completed(Value),
    Failed(ToolError),
    Cancelled,
}

/// Dispatch a tool, racing asynchronous bodies against cancellation
///
/// Synchronous bodies are non-suspending and run to completion regardless
/// of the token; the next boundary check observes it.
async fn invoke(entry: &ToolEntry, args: Value, cancel: &CancellationToken) -> Invocation {
    if entry.is_async() {
        tokio::select! {
            _ = cancel.cancelled() => Invocation::Cancelled,
            result = entry.invoke(args) => match result {
                Ok(output) => Invocation::Completed(output),
                Err(err) => Invocation::Failed(err),
            },
        }
    } else {
        match entry.invoke(args).await {
            Ok(output) => Invocation::Completed(output),
            Err(err) => Invocation::Failed(err),
        }
    }
}

async fn drive(
    plan: Plan,
    registry: Arc<ToolRegistry>,
    cancel: CancellationToken,
    tx: mpsc::Sender<Event>,
    verbose: bool,
) {
    let mut state = RunState::new();

    if !emit(
        &tx,
        Event::start(state.run_id, plan.id.clone(), plan.steps.len()),
    )
    .await
    {
        return;
    }

    for step in &plan.steps {
        // cancellation is observed at step boundaries, before the guard
        if cancel.is_cancelled() {
            cancelled(&tx, &state, &step.id, "run cancelled").await;
            return;
        }

        if let Some(source) = &step.run_if {
            match evaluate_predicate(source, &state.context) {
                Ok(true) => {}
                Ok(false) => {
                    if verbose {
                        tracing::debug!(step = %step.id, expression = %source, "guard falsy, skipping step");
                    }
                    if !emit(&tx, Event::step_skipped(&step.id, source)).await {
                        return;
                    }
                    continue;
                }
                Err(err) => {
                    tracing::warn!(step = %step.id, error = %err, "guard evaluation failed");
                    fail(
                        &tx,
                        &state,
                        &step.id,
                        ErrorKind::Expression,
                        err.to_string(),
                        None,
                    )
                    .await;
                    return;
                }
            }
        }

        // arguments resolve eagerly; the tool only ever sees concrete values
        let resolved = match &step.args {
            Some(args) => match resolve_args(args, &state.context) {
                Ok(resolved) => resolved,
                Err(err) => {
                    tracing::warn!(step = %step.id, error = %err, "argument resolution failed");
                    fail(
                        &tx,
                        &state,
                        &step.id,
                        ErrorKind::Expression,
                        err.to_string(),
                        None,
                    )
                    .await;
                    return;
                }
            },
            None => Map::new(),
        };

        if !emit(
            &tx,
            Event::new(EventKind::StepStart {
                step_id: step.id.clone(),
                tool: step.tool.clone(),
                resolved_args: resolved.clone(),
                description: step.description.clone(),
                key_finding: step.key_finding,
            }),
        )
        .await
        {
            return;
        }

        // validation guarantees the tool exists; guard anyway rather than
        // panic inside the driving task
        let Some(entry) = registry.get(&step.tool) else {
            fail(
                &tx,
                &state,
                &step.id,
                ErrorKind::Tool,
                format!("tool '{}' is not registered", step.tool),
                None,
            )
            .await;
            return;
        };

        if verbose {
            tracing::debug!(step = %step.id, tool = %step.tool, "dispatching tool");
        }

        let dispatched = Instant::now();
        let output = match invoke(entry, Value::Object(resolved), &cancel).await {
            Invocation::Completed(output) => output,
            Invocation::Failed(err) => {
                tracing::warn!(step = %step.id, tool = %step.tool, error = %err, "tool failed");
                fail(
                    &tx,
                    &state,
                    &step.id,
                    ErrorKind::Tool,
                    err.message,
                    err.cause,
                )
                .await;
                return;
            }
            Invocation::Cancelled => {
                cancelled(&tx, &state, &step.id, "run cancelled while awaiting tool").await;
                return;
            }
        };
        let duration_ms = dispatched.elapsed().as_millis() as u64;

        // the output commits before the escalation check: an intervention
        // still leaves it visible in the terminal snapshot
        state.context.insert(step.id.clone(), output.clone());
        state.steps_completed += 1;
        if step.key_finding {
            state.key_findings.push(step.id.clone());
        }

        if let Some(source) = &step.intervention_if {
            match evaluate_predicate(source, &state.context) {
                Ok(true) => {
                    tracing::warn!(step = %step.id, expression = %source, "escalation predicate fired");
                    if !emit(
                        &tx,
                        Event::new(EventKind::InterventionNeeded {
                            step_id: step.id.clone(),
                            expression: source.clone(),
                            output,
                        }),
                    )
                    .await
                    {
                        return;
                    }
                    let _ = emit(
                        &tx,
                        state.finish(
                            Verdict::InterventionNeeded,
                            None,
                            Some(step.id.clone()),
                        ),
                    )
                    .await;
                    return;
                }
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(step = %step.id, error = %err, "escalation evaluation failed");
                    fail(
                        &tx,
                        &state,
                        &step.id,
                        ErrorKind::Expression,
                        err.to_string(),
                        None,
                    )
                    .await;
                    return;
                }
            }
        }

        if !emit(
            &tx,
            Event::new(EventKind::StepComplete {
                step_id: step.id.clone(),
                output,
                duration_ms,
            }),
        )
        .await
        {
            return;
        }
    }

    let _ = emit(&tx, state.finish(Verdict::Success, None, None)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Step;
    use serde_json::json;

    #[test]
    fn test_config_default() {
        let config = ExecutorConfig::default();
        assert_eq!(config.event_buffer, 1);
        assert!(!config.verbose);
    }

    #[test]
    fn test_config_builder() {
        let config = ExecutorConfig::new().with_event_buffer(8).with_verbose(true);
        assert_eq!(config.event_buffer, 8);
        assert!(config.verbose);
    }

    #[tokio::test]
    async fn test_invalid_plan_rejected_before_any_event() {
        let executor = Executor::new(Arc::new(ToolRegistry::new()));
        let plan = Plan::from_steps(vec![Step::new("s1", "missing_tool")]);

        let result = executor.run(plan, CancellationToken::new());
        assert!(matches!(result, Err(ValidationError::UnknownTool { .. })));
    }

    #[tokio::test]
    async fn test_single_step_run() {
        let mut registry = ToolRegistry::new();
        registry
            .register_fn("scan_hull", |_args| {
                Ok(json!({"integrity": 98, "breach": false}))
            })
            .unwrap();

        let executor = Executor::new(Arc::new(registry));
        let plan = Plan::from_steps(vec![Step::new("s1", "scan_hull")]);

        let result = executor
            .run_to_end(plan, CancellationToken::new())
            .await
            .unwrap();

        assert!(result.is_success());
        assert_eq!(result.steps_completed, 1);
        assert_eq!(result.outputs["s1"]["integrity"], json!(98));
    }
}
