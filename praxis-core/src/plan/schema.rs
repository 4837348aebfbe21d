//! Plan and step definitions

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single step in a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    /// Unique step identifier; the namespace for `$id` references
    pub id: String,

    /// Tool name, resolved against the registry at validation time
    pub tool: String,

    /// Human-readable description, surfaced in events but opaque to the
    /// engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Tool arguments; string values that are entirely a `$reference` are
    /// resolved against the context before dispatch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Map<String, Value>>,

    /// Guard expression; when present and falsy the step is skipped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_if: Option<String>,

    /// Escalation expression, evaluated against the step's own output after
    /// it completes; truthy halts the run with an intervention verdict
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intervention_if: Option<String>,

    /// Advisory flag marking this step's output as notable for downstream
    /// summaries
    #[serde(default, skip_serializing_if = "is_false")]
    pub key_finding: bool,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

impl Step {
    /// Create a minimal step invoking a tool with no arguments
    pub fn new(id: impl Into<String>, tool: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tool: tool.into(),
            description: None,
            args: None,
            run_if: None,
            intervention_if: None,
            key_finding: false,
        }
    }
}

/// Defines when an agent should consider a saved skill
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkillTriggers {
    /// Keywords that suggest this skill
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    /// User intents this skill addresses
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_intents: Vec<String>,

    /// Required context before using
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prerequisites: Option<Vec<String>>,

    /// Situations to avoid this skill
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avoid_when: Option<Vec<String>>,
}

/// A declarative tool-chain document
///
/// Step order is authoritative; the engine never reorders. A plan with
/// usage guidance populated is a saved skill (see [`Plan::is_skill`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Plan {
    /// Identifier, echoed in the `Start` event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Human-readable name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// What this tool chain does
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Ordered execution steps
    pub steps: Vec<Step>,

    /// Guidance on when an agent should reach for this skill
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_to_use: Option<String>,

    /// What to expect after running
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_outcome: Option<String>,

    /// Automatic trigger conditions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggers: Option<SkillTriggers>,

    /// Tips for debugging if the skill fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_tips: Option<Vec<String>>,

    /// Individual tools to try if the skill fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_tools: Option<Vec<String>>,
}

impl Plan {
    /// Create a plan from steps alone
    pub fn from_steps(steps: Vec<Step>) -> Self {
        Self {
            id: None,
            name: None,
            description: None,
            steps,
            when_to_use: None,
            expected_outcome: None,
            triggers: None,
            debug_tips: None,
            fallback_tools: None,
        }
    }

    /// Parse a plan from a JSON document
    pub fn from_json(document: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(document)
    }

    /// Check if this plan carries skill metadata (is a saved skill)
    pub fn is_skill(&self) -> bool {
        self.when_to_use.is_some() || self.expected_outcome.is_some() || self.triggers.is_some()
    }

    /// Number of steps in document order
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plan_from_json() {
        let plan = Plan::from_json(
            r#"{
                "id": "diagnostic_sequence",
                "name": "Diagnostic Sequence",
                "steps": [
                    {"id": "s1", "tool": "scan_hull", "description": "External hull integrity scan"},
                    {"id": "s2", "tool": "check_oxygen", "key_finding": true},
                    {
                        "id": "s3",
                        "tool": "analyze_atmosphere",
                        "args": {"o2_level": "$s2.level"},
                        "intervention_if": "$s3.severity == 'HIGH'"
                    }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(plan.id.as_deref(), Some("diagnostic_sequence"));
        assert_eq!(plan.step_count(), 3);
        assert!(plan.steps[1].key_finding);
        assert_eq!(
            plan.steps[2].args.as_ref().unwrap()["o2_level"],
            json!("$s2.level")
        );
        assert!(!plan.is_skill());
    }

    #[test]
    fn test_plan_rejects_unknown_fields() {
        let result = Plan::from_json(
            r#"{"steps": [{"id": "s1", "tool": "scan_hull", "retries": 3}]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_skill_metadata() {
        let plan = Plan::from_json(
            r#"{
                "name": "Oxygen Audit",
                "steps": [{"id": "s1", "tool": "check_oxygen"}],
                "when_to_use": "When life support readings look off",
                "triggers": {"keywords": ["oxygen", "air"]},
                "fallback_tools": ["check_oxygen"]
            }"#,
        )
        .unwrap();

        assert!(plan.is_skill());
        assert_eq!(plan.triggers.unwrap().keywords, vec!["oxygen", "air"]);
    }

    #[test]
    fn test_serialization_omits_empty_fields() {
        let plan = Plan::from_steps(vec![Step::new("s1", "scan_hull")]);
        let value = serde_json::to_value(&plan).unwrap();

        assert_eq!(
            value,
            json!({"steps": [{"id": "s1", "tool": "scan_hull"}]})
        );
    }
}
