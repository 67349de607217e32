//! Flow-level error types.

use thiserror::Error;

use crate::error::GraphError;

/// Top-level errors for flow parsing and running.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Flow parse error: {0}")]
    ParseError(String),
    #[error("Unsupported flow version: {found}, supported versions: {supported}")]
    UnsupportedVersion { found: String, supported: String },
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
    #[error("Node not found: {0}")]
    NodeNotFound(String),
    #[error("Run input '{0}' declared by the flow but not supplied")]
    MissingRunInput(String),
    #[error("Run input '{0}' supplied but not declared by the flow")]
    UndeclaredRunInput(String),
    #[error("Output {node}.{output} written twice")]
    DuplicateWrite { node: String, output: String },
    #[error("Run timeout")]
    Timeout,
    #[error("Node execution error: node={node}, error={error}")]
    NodeExecutionError { node: String, error: String },
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_error_display() {
        assert_eq!(
            FlowError::ParseError("x".into()).to_string(),
            "Flow parse error: x"
        );
        assert_eq!(
            FlowError::MissingRunInput("domains".into()).to_string(),
            "Run input 'domains' declared by the flow but not supplied"
        );
        assert_eq!(
            FlowError::DuplicateWrite {
                node: "fetch".into(),
                output: "text".into()
            }
            .to_string(),
            "Output fetch.text written twice"
        );
        assert_eq!(FlowError::Timeout.to_string(), "Run timeout");
    }

    #[test]
    fn test_flow_error_from_graph_error() {
        let err: FlowError = GraphError::CycleDetected.into();
        assert!(matches!(err, FlowError::Graph(GraphError::CycleDetected)));
        assert!(err.to_string().contains("Cycle"));
    }
}
