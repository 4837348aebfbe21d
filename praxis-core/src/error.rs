//! Error types for Praxis operations

use crate::expr::ExprError;
use crate::plan::ValidationError;
use crate::tools::{RegistryError, ToolError};

/// Result type for Praxis operations
pub type Result<T> = std::result::Result<T, PraxisError>;

/// Error types for the Praxis engine
#[derive(Debug, thiserror::Error)]
pub enum PraxisError {
    /// Plan rejected before the run started
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Guard or escalation expression failed to parse or evaluate
    #[error("Expression error: {0}")]
    Expression(#[from] ExprError),

    /// A tool body reported a failure
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Tool registration failed
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for PraxisError {
    fn from(s: String) -> Self {
        PraxisError::Other(s)
    }
}

impl From<&str> for PraxisError {
    fn from(s: &str) -> Self {
        PraxisError::Other(s.to_string())
    }
}
