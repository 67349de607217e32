use thiserror::Error;

/// Typed failures crossing the collaborator boundary (functions, tool
/// clients, LLM clients). Transient kinds are retried under the engine's
/// retry policy; the rest surface immediately as the node's failure.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("Rate limited: retry after {retry_after:?}s")]
    RateLimited { retry_after: Option<u64> },

    #[error("Timeout")]
    Timeout,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool execution error: {0}")]
    ToolExecutionError(String),

    #[error("Function failed: {0}")]
    FunctionFailed(String),

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },
}

impl CollaboratorError {
    /// Transient failures worth retrying with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CollaboratorError::RateLimited { .. }
                | CollaboratorError::Timeout
                | CollaboratorError::NetworkError(_)
        )
    }
}
