//! Tool-specific error types.

use thiserror::Error;

use crate::clients::{ClientError, CommandError};

/// Result type of every tool handler.
pub type ToolResult<T> = Result<T, ToolError>;

/// Errors that can occur during tool operations.
///
/// Apart from [`ToolError::NotFound`], these are domain errors: they are
/// reported to the caller as an error-flagged tool result, so every message
/// must say what went wrong and how to fix it.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The requested tool was not found.
    #[error("tool not found: {0}")]
    NotFound(String),

    /// Invalid arguments were provided to the tool.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The invocation carries no upstream credential.
    #[error(
        "no credential provided: set MCP_API_TOKEN for the STDIO transport, or send \
         'Authorization: Bearer <token>' with each HTTP request"
    )]
    MissingCredential,

    /// The infrastructure API rejected or failed the call.
    #[error("remote call failed: {0}")]
    Remote(String),

    /// The knowledge service could not answer.
    #[error("knowledge service unavailable: {0}")]
    KnowledgeUnavailable(String),

    /// The tool execution failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// The tool timed out during execution.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The invocation was cancelled by server shutdown.
    #[error("cancelled: the server is shutting down")]
    Cancelled,

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// Create a new "not found" error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Create a new "invalid arguments" error.
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// Create a new "execution failed" error.
    pub fn execution_failed(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed(msg.into())
    }

    /// Create a new "internal" error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Wrap a knowledge service failure.
    pub fn knowledge(err: ClientError) -> Self {
        Self::KnowledgeUnavailable(err.to_string())
    }
}

impl From<ClientError> for ToolError {
    fn from(err: ClientError) -> Self {
        Self::Remote(err.to_string())
    }
}

impl From<CommandError> for ToolError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Timeout { .. } => Self::Timeout(err.to_string()),
            CommandError::Cancelled(_) => Self::Cancelled,
            other => Self::ExecutionFailed(other.to_string()),
        }
    }
}
