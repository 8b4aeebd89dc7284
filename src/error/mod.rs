//! Error types for Concierge.

use thiserror::Error;

/// Primary error type for all Concierge operations.
#[derive(Error, Debug)]
pub enum ConciergeError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("thread not found: {0}")]
    ThreadNotFound(String),

    #[error("no active thread; create or resume a thread first")]
    NoActiveThread,

    #[error("invalid tool arguments: {0}")]
    ArgumentParse(String),

    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("tool output submission failed: {0}")]
    ToolSubmission(String),

    #[error("upstream service error (status {status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("run exceeded {0} required-action cycles without settling")]
    RunStalled(usize),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("timed out after {0}ms")]
    Timeout(u64),
}

impl ConciergeError {
    /// Create an upstream error from an HTTP status and response body.
    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    /// Create a tool execution error.
    pub fn tool_execution(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ConciergeError>;
