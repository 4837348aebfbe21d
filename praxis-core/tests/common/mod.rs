//! Shared diagnostic fixtures for executor integration tests
//!
//! Mock tools modelled on a ship-diagnostics scenario: hull scans, oxygen
//! checks, atmosphere analysis. Test data only; nothing here is part of the
//! library surface.

use std::time::Duration;

use async_trait::async_trait;
use praxis_core::prelude::*;
use serde_json::{json, Value};
use std::result::Result;

/// Build a plan from inline JSON
pub fn plan(document: Value) -> Plan {
    serde_json::from_value(document).expect("fixture plan must deserialize")
}

/// The wire tag of an event, for order assertions
pub fn tag(event: &Event) -> &'static str {
    match &event.kind {
        EventKind::Start { .. } => "START",
        EventKind::StepStart { .. } => "STEP_START",
        EventKind::StepComplete { .. } => "STEP_COMPLETE",
        EventKind::StepSkipped { .. } => "STEP_SKIPPED",
        EventKind::InterventionNeeded { .. } => "INTERVENTION_NEEDED",
        EventKind::Error { .. } => "ERROR",
        EventKind::Finish { .. } => "FINISH",
    }
}

/// Tags of all events in emission order
pub fn tags(events: &[Event]) -> Vec<&'static str> {
    events.iter().map(tag).collect()
}

/// Asynchronous full-systems scan
pub struct SystemsScan;

#[async_trait]
impl AsyncTool for SystemsScan {
    async fn call(&self, _args: Value) -> Result<Value, ToolError> {
        tokio::task::yield_now().await;
        Ok(json!({
            "power": "NOMINAL",
            "navigation": "ONLINE",
            "life_support": "DEGRADED",
            "communications": "ONLINE"
        }))
    }
}

/// Asynchronous tool that takes a while; used for cancellation tests
pub struct SlowScan {
    pub delay: Duration,
}

#[async_trait]
impl AsyncTool for SlowScan {
    async fn call(&self, _args: Value) -> Result<Value, ToolError> {
        tokio::time::sleep(self.delay).await;
        Ok(json!({"power": "NOMINAL"}))
    }
}

/// Atmosphere analysis keyed on the oxygen level argument
pub fn analyze_atmosphere(args: Value) -> Result<Value, ToolError> {
    let severity = match args["o2_level"].as_f64() {
        Some(level) if level >= 18.0 => "LOW",
        Some(_) => "HIGH",
        None => "UNKNOWN",
    };
    Ok(json!({"severity": severity}))
}
