//! Structural graph-build errors.

use thiserror::Error;

/// Errors detected while building a [`Graph`](crate::graph::Graph) from node
/// definitions. All of these are fatal at build time.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Duplicate node name: {0}")]
    DuplicateNode(String),
    #[error("Node name '{0}' is reserved")]
    ReservedName(String),
    #[error("Node '{node}' input '{input}': reference '{reference}' does not resolve to a declared output")]
    DanglingReference {
        node: String,
        input: String,
        reference: String,
    },
    #[error("Node '{node}' input '{input}': run input '{name}' is not declared by the flow")]
    UnknownRunInput {
        node: String,
        input: String,
        name: String,
    },
    #[error("Node '{node}' input '{input}': selector must be [node, output]")]
    InvalidSelector { node: String, input: String },
    #[error("Cycle detected in graph")]
    CycleDetected,
    #[error("Node '{node}': no registered {kind} named '{identifier}'")]
    UnknownCollaborator {
        node: String,
        kind: &'static str,
        identifier: String,
    },
    #[error("Node '{node}': output schema '{schema}' is not registered")]
    UnknownSchema { node: String, schema: String },
    #[error("Node '{node}': duplicate declared output '{output}'")]
    DuplicateOutput { node: String, output: String },
}
