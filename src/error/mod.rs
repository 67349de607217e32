//! Error types for the pipeline engine.
//!
//! - [`GraphError`] — Structural errors raised while building a graph; fatal, the run never starts.
//! - [`NodeError`] — Errors raised during individual node execution.
//! - [`FlowError`] — Top-level errors for flow parsing and running.

pub mod flow_error;
pub mod graph_error;
pub mod node_error;

pub use flow_error::FlowError;
pub use graph_error::GraphError;
pub use node_error::NodeError;

/// Convenience alias for flow-level results.
pub type FlowResult<T> = Result<T, FlowError>;
/// Convenience alias for node-level results.
pub type NodeResult<T> = Result<T, NodeError>;
