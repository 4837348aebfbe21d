//! Tool entry: one named invocable unit, synchronous or asynchronous

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error reported by a tool body
///
/// Any tool failure ends the run; the engine never retries or skips past
/// it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct ToolError {
    /// Human-readable failure message
    pub message: String,

    /// Underlying cause, if the tool wrapped another error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl ToolError {
    /// Create a new tool error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    /// Attach an underlying cause
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}

impl From<String> for ToolError {
    fn from(message: String) -> Self {
        ToolError::new(message)
    }
}

impl From<&str> for ToolError {
    fn from(message: &str) -> Self {
        ToolError::new(message)
    }
}

/// Asynchronous tool body
///
/// Receives the fully resolved argument mapping and eventually yields a
/// JSON-shaped output value. Implementations are trusted code; the engine
/// does not sandbox them or impose per-tool timeouts.
#[async_trait]
pub trait AsyncTool: Send + Sync {
    /// Invoke the tool with resolved arguments
    async fn call(&self, args: Value) -> Result<Value, ToolError>;
}

/// Synchronous tool body
pub type SyncToolFn = Arc<dyn Fn(Value) -> Result<Value, ToolError> + Send + Sync>;

enum ToolBody {
    Sync(SyncToolFn),
    Async(Arc<dyn AsyncTool>),
}

/// A registry record: tool name, description, and invocable body
pub struct ToolEntry {
    name: String,
    description: Option<String>,
    body: ToolBody,
}

impl std::fmt::Debug for ToolEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolEntry")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("is_async", &self.is_async())
            .finish()
    }
}

impl ToolEntry {
    /// Create an entry around a synchronous callable
    pub fn sync<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: None,
            body: ToolBody::Sync(Arc::new(f)),
        }
    }

    /// Create an entry around an asynchronous tool
    pub fn asynchronous<T>(name: impl Into<String>, tool: T) -> Self
    where
        T: AsyncTool + 'static,
    {
        Self {
            name: name.into(),
            description: None,
            body: ToolBody::Async(Arc::new(tool)),
        }
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Tool name (unique within a registry)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tool description, if any
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Whether this entry's body is asynchronous
    pub fn is_async(&self) -> bool {
        matches!(self.body, ToolBody::Async(_))
    }

    /// Invoke the tool with a resolved argument mapping
    ///
    /// Synchronous bodies return without suspending; asynchronous bodies
    /// are awaited.
    pub async fn invoke(&self, args: Value) -> Result<Value, ToolError> {
        match &self.body {
            ToolBody::Sync(f) => f(args),
            ToolBody::Async(tool) => tool.call(args).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl AsyncTool for Echo {
        async fn call(&self, args: Value) -> Result<Value, ToolError> {
            Ok(args)
        }
    }

    #[tokio::test]
    async fn test_sync_entry() {
        let entry = ToolEntry::sync("scan_hull", |_args| {
            Ok(json!({"integrity": 98, "breach": false}))
        })
        .with_description("Scan the hull for breaches");

        assert_eq!(entry.name(), "scan_hull");
        assert!(!entry.is_async());

        let output = entry.invoke(json!({})).await.unwrap();
        assert_eq!(output["integrity"], json!(98));
    }

    #[tokio::test]
    async fn test_async_entry() {
        let entry = ToolEntry::asynchronous("echo", Echo);
        assert!(entry.is_async());

        let output = entry.invoke(json!({"message": "hello"})).await.unwrap();
        assert_eq!(output["message"], json!("hello"));
    }

    #[tokio::test]
    async fn test_sync_entry_error() {
        let entry = ToolEntry::sync("broken", |_args| {
            Err(ToolError::new("sensor offline").with_cause("bus timeout"))
        });

        let err = entry.invoke(json!({})).await.unwrap_err();
        assert_eq!(err.message, "sensor offline");
        assert_eq!(err.cause.as_deref(), Some("bus timeout"));
    }
}
