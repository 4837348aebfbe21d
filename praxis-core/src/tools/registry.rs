//! Tool registry: registration and lookup by name

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entry::{AsyncTool, ToolEntry, ToolError};

/// Error type for registry operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    /// Tool with this name already exists
    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),

    /// Tool not found
    #[error("tool '{0}' not found")]
    NotFound(String),
}

/// Summary of a registered tool for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSummary {
    /// Tool name
    pub name: String,
    /// Tool description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the body is asynchronous
    pub is_async: bool,
}

impl From<&ToolEntry> for ToolSummary {
    fn from(entry: &ToolEntry) -> Self {
        Self {
            name: entry.name().to_string(),
            description: entry.description().map(str::to_string),
            is_async: entry.is_async(),
        }
    }
}

/// Registry mapping tool names to invocable entries
///
/// Populated before a run and read-only while one is in flight. Duplicate
/// names are rejected at registration time; unknown names surface as
/// validation errors before any event is emitted.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolEntry>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pre-built entry
    ///
    /// Returns an error if a tool with the same name is already registered.
    pub fn register(&mut self, entry: ToolEntry) -> Result<(), RegistryError> {
        let name = entry.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        self.tools.insert(name, entry);
        Ok(())
    }

    /// Register a synchronous callable under a name
    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F) -> Result<(), RegistryError>
    where
        F: Fn(Value) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        self.register(ToolEntry::sync(name, f))
    }

    /// Register an asynchronous tool under a name
    pub fn register_async<T>(&mut self, name: impl Into<String>, tool: T) -> Result<(), RegistryError>
    where
        T: AsyncTool + 'static,
    {
        self.register(ToolEntry::asynchronous(name, tool))
    }

    /// Get an entry by name
    pub fn get(&self, name: &str) -> Option<&ToolEntry> {
        self.tools.get(name)
    }

    /// Check if a tool is registered
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// All registered tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// List all tools with their summaries
    pub fn list(&self) -> Vec<ToolSummary> {
        self.tools.values().map(ToolSummary::from).collect()
    }
}
