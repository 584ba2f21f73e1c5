//! Tool-level failures.
//!
//! None of these abort a turn. Each is rendered into a structured JSON
//! payload and recorded as the tool message, so the model sees the failure.

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("tool '{name}' not found")]
    NotFound { name: String },

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("tool execution failed: {0}")]
    Execution(String),

    #[error("tool panicked: {0}")]
    Panicked(String),
}

impl ToolError {
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments(message.into())
    }

    /// Short machine-friendly kind, used as the `error` field of the payload.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "tool not found",
            Self::InvalidArguments(_) => "invalid arguments",
            Self::Execution(_) | Self::Panicked(_) => "tool execution failed",
        }
    }

    /// The model-visible payload: `{"error": <kind>, "detail": <message>}`.
    pub fn to_payload(&self) -> Value {
        serde_json::json!({
            "error": self.kind(),
            "detail": self.to_string(),
        })
    }
}
