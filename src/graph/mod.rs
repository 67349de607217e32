//! Dependency graph: build-time validation and topological structure.

pub mod builder;
pub mod traversal;
pub mod types;

pub use builder::Graph;
pub use types::{FlowGraph, GraphEdge, GraphNode, NodeIndexMap, OutputCatalog};
