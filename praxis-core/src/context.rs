//! Run context: the accumulating record of completed step outputs
//!
//! The context is owned exclusively by one run of the executor. It grows
//! monotonically as steps commit and is handed out by value only in the
//! terminal event. Tools never see it; they receive resolved argument
//! values instead.

use serde_json::{Map, Value};

/// Append-only mapping from completed step id to that step's output
#[derive(Debug, Clone, Default)]
pub struct Context {
    entries: Map<String, Value>,
}

impl Context {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a step's output under its id
    ///
    /// Step ids are unique per validated plan, so an id is never written
    /// twice within one run.
    pub fn insert(&mut self, step_id: impl Into<String>, output: Value) {
        self.entries.insert(step_id.into(), output);
    }

    /// Get a completed step's output
    pub fn get(&self, step_id: &str) -> Option<&Value> {
        self.entries.get(step_id)
    }

    /// Check whether a step has committed an output
    pub fn contains(&self, step_id: &str) -> bool {
        self.entries.contains_key(step_id)
    }

    /// Number of committed outputs
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no step has committed yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clone the current contents into a plain JSON map
    pub fn snapshot(&self) -> Map<String, Value> {
        self.entries.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_and_get() {
        let mut ctx = Context::new();
        assert!(ctx.is_empty());

        ctx.insert("s1", json!({"level": 21.0}));

        assert_eq!(ctx.len(), 1);
        assert!(ctx.contains("s1"));
        assert_eq!(ctx.get("s1").unwrap()["level"], json!(21.0));
        assert!(ctx.get("s2").is_none());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut ctx = Context::new();
        ctx.insert("s1", json!(1));

        let snap = ctx.snapshot();
        ctx.insert("s2", json!(2));

        assert_eq!(snap.len(), 1);
        assert_eq!(ctx.len(), 2);
    }
}
