//! Event model and terminal result
//!
//! A run emits a totally ordered, finite stream of events: one `Start`,
//! per-step progress, and exactly one `Finish` carrying the verdict and the
//! full context snapshot. Callers that do not want the stream materialize
//! it into an [`ExecutionResult`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Final classification of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// Every step was executed or skipped without a terminal condition
    Success,
    /// An expression, reference, or tool error ended the run
    Failure,
    /// An escalation predicate fired
    InterventionNeeded,
    /// The caller cancelled the run
    Cancelled,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Verdict::Success => "SUCCESS",
            Verdict::Failure => "FAILURE",
            Verdict::InterventionNeeded => "INTERVENTION_NEEDED",
            Verdict::Cancelled => "CANCELLED",
        };
        f.write_str(name)
    }
}

/// Classification of a terminal error event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Pre-run shape or reference check failed
    Validation,
    /// Guard/escalation parsing, typing, or reference resolution failed
    Expression,
    /// A tool body reported a failure
    Tool,
    /// The caller cancelled the run
    Cancelled,
}

/// An event emitted during plan execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// UTC emission time
    pub timestamp: DateTime<Utc>,

    /// Variant and payload
    #[serde(flatten)]
    pub kind: EventKind,
}

/// Event variants and their payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// The run has started; precedes all other events
    Start {
        /// Correlation id for this run
        run_id: Uuid,
        /// Plan identifier, if the document carried one
        #[serde(default, skip_serializing_if = "Option::is_none")]
        plan_id: Option<String>,
        /// Number of steps in document order
        step_count: usize,
    },

    /// A step passed its guard and is being dispatched
    StepStart {
        step_id: String,
        /// Tool being invoked
        tool: String,
        /// Fully resolved arguments, free of `$` references
        resolved_args: Map<String, Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        /// Advisory key-finding flag from the plan
        key_finding: bool,
    },

    /// A step committed its output to the context
    StepComplete {
        step_id: String,
        output: Value,
        /// Tool invocation time in milliseconds
        duration_ms: u64,
    },

    /// A step's guard evaluated falsy; the step did not run
    StepSkipped {
        step_id: String,
        /// Which predicate caused the skip
        reason: String,
        /// The guard expression text
        expression: String,
    },

    /// An escalation predicate fired; the run halts after this step
    InterventionNeeded {
        step_id: String,
        /// The escalation expression text
        expression: String,
        /// The step's committed output
        output: Value,
    },

    /// A terminal error; followed by exactly one `Finish`
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step_id: Option<String>,
        kind: ErrorKind,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cause: Option<String>,
    },

    /// The run is over; always the last event
    Finish {
        run_id: Uuid,
        verdict: Verdict,
        /// All committed step outputs at termination
        context_snapshot: Map<String, Value>,
        /// Ids of key-finding steps that ran, in document order
        key_findings: Vec<String>,
        /// Number of steps that committed an output
        steps_completed: usize,
        total_duration_ms: u64,
        /// Step id of the first terminal error, if any
        #[serde(default, skip_serializing_if = "Option::is_none")]
        first_error: Option<String>,
        /// Step id whose escalation fired, if any
        #[serde(default, skip_serializing_if = "Option::is_none")]
        intervention_trigger: Option<String>,
    },
}

impl Event {
    /// Wrap a kind with the current UTC timestamp
    pub fn new(kind: EventKind) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
        }
    }

    /// Create a `Start` event
    pub fn start(run_id: Uuid, plan_id: Option<String>, step_count: usize) -> Self {
        Self::new(EventKind::Start {
            run_id,
            plan_id,
            step_count,
        })
    }

    /// Create a `StepSkipped` event for a falsy guard
    pub fn step_skipped(step_id: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::new(EventKind::StepSkipped {
            step_id: step_id.into(),
            reason: "run_if".to_string(),
            expression: expression.into(),
        })
    }

    /// Create an `Error` event
    pub fn error(
        step_id: Option<String>,
        kind: ErrorKind,
        message: impl Into<String>,
        cause: Option<String>,
    ) -> Self {
        Self::new(EventKind::Error {
            step_id,
            kind,
            message: message.into(),
            cause,
        })
    }

    /// The step this event concerns, if any
    pub fn step_id(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Start { .. } => None,
            EventKind::StepStart { step_id, .. }
            | EventKind::StepComplete { step_id, .. }
            | EventKind::StepSkipped { step_id, .. }
            | EventKind::InterventionNeeded { step_id, .. } => Some(step_id),
            EventKind::Error { step_id, .. } => step_id.as_deref(),
            EventKind::Finish { .. } => None,
        }
    }

    /// Whether this event terminates the stream
    pub fn is_finish(&self) -> bool {
        matches!(self.kind, EventKind::Finish { .. })
    }
}

/// Materialized outcome of a run, equivalent to the `Finish` payload plus
/// the full ordered event list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Correlation id for this run
    pub run_id: Uuid,

    /// Final verdict
    pub verdict: Verdict,

    /// All committed step outputs, keyed by step id
    pub outputs: Map<String, Value>,

    /// Ids of key-finding steps that ran
    pub key_findings: Vec<String>,

    /// Number of steps that committed an output
    pub steps_completed: usize,

    /// Wall-clock run duration in milliseconds
    pub duration_ms: u64,

    /// Step id of the first terminal error, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_error: Option<String>,

    /// Step id whose escalation fired, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intervention_trigger: Option<String>,

    /// Message of the terminal error event, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Every event of the run, in emission order
    pub events: Vec<Event>,
}

impl ExecutionResult {
    /// Build a result from a fully drained event stream
    ///
    /// The payload comes from the single `Finish` event. Should the stream
    /// have ended without one (a consumer bug, not reachable through the
    /// executor), the result reports a failure instead of panicking.
    pub fn from_events(events: Vec<Event>) -> Self {
        let error = events.iter().find_map(|event| match &event.kind {
            EventKind::Error { message, .. } => Some(message.clone()),
            _ => None,
        });

        let finish = events.iter().rev().find_map(|event| match &event.kind {
            EventKind::Finish {
                run_id,
                verdict,
                context_snapshot,
                key_findings,
                steps_completed,
                total_duration_ms,
                first_error,
                intervention_trigger,
            } => Some(Self {
                run_id: *run_id,
                verdict: *verdict,
                outputs: context_snapshot.clone(),
                key_findings: key_findings.clone(),
                steps_completed: *steps_completed,
                duration_ms: *total_duration_ms,
                first_error: first_error.clone(),
                intervention_trigger: intervention_trigger.clone(),
                error: error.clone(),
                events: Vec::new(),
            }),
            _ => None,
        });

        match finish {
            Some(mut result) => {
                result.events = events;
                result
            }
            None => {
                let run_id = events
                    .iter()
                    .find_map(|event| match &event.kind {
                        EventKind::Start { run_id, .. } => Some(*run_id),
                        _ => None,
                    })
                    .unwrap_or_else(Uuid::nil);
                Self {
                    run_id,
                    verdict: Verdict::Failure,
                    outputs: Map::new(),
                    key_findings: Vec::new(),
                    steps_completed: 0,
                    duration_ms: 0,
                    first_error: None,
                    intervention_trigger: None,
                    error: Some("event stream ended without a FINISH event".to_string()),
                    events,
                }
            }
        }
    }

    /// Whether the run finished with a `Success` verdict
    pub fn is_success(&self) -> bool {
        self.verdict == Verdict::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_serialization_tags() {
        let event = Event::start(Uuid::nil(), Some("diag".to_string()), 3);
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["type"], json!("START"));
        assert_eq!(value["plan_id"], json!("diag"));
        assert_eq!(value["step_count"], json!(3));
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_error_event_serialization() {
        let event = Event::error(
            Some("s1".to_string()),
            ErrorKind::Tool,
            "sensor offline",
            None,
        );
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["type"], json!("ERROR"));
        assert_eq!(value["kind"], json!("TOOL"));
        assert_eq!(value["step_id"], json!("s1"));
        assert!(value.get("cause").is_none());
    }

    #[test]
    fn test_event_roundtrip() {
        let event = Event::new(EventKind::StepComplete {
            step_id: "s2".to_string(),
            output: json!({"level": 21.0}),
            duration_ms: 12,
        });

        let text = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&text).unwrap();

        assert_eq!(back.step_id(), Some("s2"));
        match back.kind {
            EventKind::StepComplete { duration_ms, .. } => assert_eq!(duration_ms, 12),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_verdict_display() {
        assert_eq!(Verdict::InterventionNeeded.to_string(), "INTERVENTION_NEEDED");
        assert_eq!(Verdict::Success.to_string(), "SUCCESS");
    }

    #[test]
    fn test_result_from_events_without_finish() {
        let events = vec![Event::start(Uuid::nil(), None, 1)];
        let result = ExecutionResult::from_events(events);

        assert_eq!(result.verdict, Verdict::Failure);
        assert!(result.error.unwrap().contains("FINISH"));
    }

    #[test]
    fn test_result_from_events_with_finish() {
        let run_id = Uuid::new_v4();
        let mut snapshot = Map::new();
        snapshot.insert("s1".to_string(), json!({"integrity": 98}));

        let events = vec![
            Event::start(run_id, None, 1),
            Event::new(EventKind::Finish {
                run_id,
                verdict: Verdict::Success,
                context_snapshot: snapshot,
                key_findings: vec!["s1".to_string()],
                steps_completed: 1,
                total_duration_ms: 40,
                first_error: None,
                intervention_trigger: None,
            }),
        ];

        let result = ExecutionResult::from_events(events);
        assert!(result.is_success());
        assert_eq!(result.run_id, run_id);
        assert_eq!(result.steps_completed, 1);
        assert_eq!(result.key_findings, vec!["s1"]);
        assert_eq!(result.outputs["s1"]["integrity"], json!(98));
        assert_eq!(result.events.len(), 2);
    }
}
