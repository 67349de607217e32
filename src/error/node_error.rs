use thiserror::Error;

use crate::collaborator::CollaboratorError;
use crate::schema::SchemaMismatch;
use crate::template::TemplateError;

/// Node-level errors. Any of these fails the node and skips its dependents.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Input '{input}' could not be resolved: {reference} is absent from the run context")]
    MissingInput { input: String, reference: String },
    #[error("Declared output '{0}' missing from node result")]
    MissingOutput(String),
    #[error("Schema validation failed: {0}")]
    SchemaMismatch(#[from] SchemaMismatch),
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),
    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),
    #[error("Execution error: {0}")]
    ExecutionError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl NodeError {
    /// Whether the underlying failure is transient and worth retrying.
    /// Only collaborator failures can be transient; everything else is
    /// deterministic and retrying would reproduce it.
    pub fn is_retryable(&self) -> bool {
        match self {
            NodeError::Collaborator(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// The `retry_after` hint carried by a rate-limit failure, if any.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            NodeError::Collaborator(CollaboratorError::RateLimited { retry_after }) => *retry_after,
            _ => None,
        }
    }
}

impl From<serde_json::Error> for NodeError {
    fn from(e: serde_json::Error) -> Self {
        NodeError::SerializationError(e.to_string())
    }
}
