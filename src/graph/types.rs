use std::collections::HashMap;

use petgraph::stable_graph::{NodeIndex, StableDiGraph};

use crate::dsl::NodeDefinition;

/// A node resolved into the graph.
#[derive(Debug, Clone)]
pub struct GraphNode {
    pub name: String,
    pub definition: NodeDefinition,
    /// The node's resolvable output names.
    pub outputs: OutputCatalog,
}

/// Output names a node exposes to downstream references.
///
/// `Deferred` appears only in structural builds, where a node's outputs come
/// from an output schema that is not consulted; references to such a node are
/// checked against the node, not the output name.
#[derive(Debug, Clone)]
pub enum OutputCatalog {
    Known(Vec<String>),
    Deferred,
}

impl OutputCatalog {
    pub fn contains(&self, output: &str) -> bool {
        match self {
            OutputCatalog::Known(outputs) => outputs.iter().any(|o| o == output),
            OutputCatalog::Deferred => true,
        }
    }

    /// Known output names, empty for deferred catalogs.
    pub fn names(&self) -> &[String] {
        match self {
            OutputCatalog::Known(outputs) => outputs,
            OutputCatalog::Deferred => &[],
        }
    }
}

/// A data-dependency edge: `source`'s `output` feeds `target`'s `input`.
#[derive(Debug, Clone)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub output: String,
    pub input: String,
}

pub type NodeIndexMap = HashMap<String, NodeIndex>;
pub type FlowGraph = StableDiGraph<GraphNode, GraphEdge>;
