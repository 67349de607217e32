use std::collections::{HashMap, HashSet};

use petgraph::stable_graph::{NodeIndex, StableDiGraph};

use crate::collaborator::CollaboratorRegistry;
use crate::dsl::{FlowSchema, InputBinding, NodeKind, RUN_INPUT_NODE};
use crate::error::{FlowError, GraphError};
use crate::schema::SchemaRegistry;

use super::traversal;
use super::types::*;

/// An immutable, validated dependency graph ready for execution.
#[derive(Debug)]
pub struct Graph {
    /// Flow name carried over from the document.
    pub name: String,

    /// Graph structure.
    pub graph: FlowGraph,

    /// Node name to NodeIndex mapping.
    pub node_index_map: NodeIndexMap,

    /// Run inputs the caller must supply.
    pub run_inputs: Vec<String>,
}

impl Graph {
    /// Build and fully validate a graph: structure (names, references,
    /// cycles) plus semantics (registered collaborators and schemas).
    /// Collaborator registration must precede this call.
    pub fn build(
        flow: &FlowSchema,
        collaborators: &CollaboratorRegistry,
        schemas: &SchemaRegistry,
    ) -> Result<Graph, GraphError> {
        let graph = Self::assemble(flow, Some(schemas))?;

        for idx in graph.graph.node_indices() {
            let node = &graph.graph[idx];
            match &node.definition.kind {
                NodeKind::Function { function } => {
                    if !collaborators.has_function(function) {
                        return Err(GraphError::UnknownCollaborator {
                            node: node.name.clone(),
                            kind: "function",
                            identifier: function.clone(),
                        });
                    }
                }
                NodeKind::Prompt { llm, .. } => {
                    if !collaborators.has_llm(llm) {
                        return Err(GraphError::UnknownCollaborator {
                            node: node.name.clone(),
                            kind: "llm client",
                            identifier: llm.clone(),
                        });
                    }
                }
                NodeKind::Tool { tool } => {
                    if !collaborators.has_tool(tool) {
                        return Err(GraphError::UnknownCollaborator {
                            node: node.name.clone(),
                            kind: "tool client",
                            identifier: tool.clone(),
                        });
                    }
                }
            }
        }

        Ok(graph)
    }

    /// Build with structural validation only — duplicate names, dangling
    /// references, cycles. Used by tooling that has no registries at hand;
    /// output schemas are not consulted, so schema-derived outputs are
    /// deferred.
    pub fn build_structural(flow: &FlowSchema) -> Result<Graph, GraphError> {
        Self::assemble(flow, None)
    }

    fn assemble(flow: &FlowSchema, schemas: Option<&SchemaRegistry>) -> Result<Graph, GraphError> {
        let mut graph = StableDiGraph::<GraphNode, GraphEdge>::new();
        let mut node_index_map: HashMap<String, NodeIndex> = HashMap::new();

        // 1. Add all nodes, resolving each node's output catalog.
        for def in &flow.nodes {
            if def.name == RUN_INPUT_NODE {
                return Err(GraphError::ReservedName(def.name.clone()));
            }
            if node_index_map.contains_key(&def.name) {
                return Err(GraphError::DuplicateNode(def.name.clone()));
            }

            let outputs = match &def.output_schema {
                Some(schema_name) => match schemas {
                    Some(registry) => {
                        let schema = registry.get(schema_name).ok_or_else(|| {
                            GraphError::UnknownSchema {
                                node: def.name.clone(),
                                schema: schema_name.clone(),
                            }
                        })?;
                        OutputCatalog::Known(schema.field_names())
                    }
                    None => OutputCatalog::Deferred,
                },
                None => {
                    let mut seen = HashSet::new();
                    for output in &def.outputs {
                        if !seen.insert(output.as_str()) {
                            return Err(GraphError::DuplicateOutput {
                                node: def.name.clone(),
                                output: output.clone(),
                            });
                        }
                    }
                    OutputCatalog::Known(def.outputs.clone())
                }
            };

            let idx = graph.add_node(GraphNode {
                name: def.name.clone(),
                definition: def.clone(),
                outputs,
            });
            node_index_map.insert(def.name.clone(), idx);
        }

        // 2. Resolve input references into edges.
        for def in &flow.nodes {
            let target_idx = node_index_map[&def.name];
            for (input, binding) in &def.inputs {
                let InputBinding::Reference { from } = binding else {
                    continue;
                };
                let [source, output] = from.as_slice() else {
                    return Err(GraphError::InvalidSelector {
                        node: def.name.clone(),
                        input: input.clone(),
                    });
                };

                if source == RUN_INPUT_NODE {
                    if !flow.inputs.contains(output) {
                        return Err(GraphError::UnknownRunInput {
                            node: def.name.clone(),
                            input: input.clone(),
                            name: output.clone(),
                        });
                    }
                    continue;
                }

                let source_idx =
                    node_index_map
                        .get(source)
                        .copied()
                        .ok_or_else(|| GraphError::DanglingReference {
                            node: def.name.clone(),
                            input: input.clone(),
                            reference: format!("{}.{}", source, output),
                        })?;
                if !graph[source_idx].outputs.contains(output) {
                    return Err(GraphError::DanglingReference {
                        node: def.name.clone(),
                        input: input.clone(),
                        reference: format!("{}.{}", source, output),
                    });
                }

                graph.add_edge(
                    source_idx,
                    target_idx,
                    GraphEdge {
                        source: source.clone(),
                        target: def.name.clone(),
                        output: output.clone(),
                        input: input.clone(),
                    },
                );
            }
        }

        // 3. DAG check.
        if petgraph::algo::is_cyclic_directed(&graph) {
            return Err(GraphError::CycleDetected);
        }

        Ok(Graph {
            name: flow.name.clone(),
            graph,
            node_index_map,
            run_inputs: flow.inputs.clone(),
        })
    }

    /// Look up a graph node by name.
    pub fn node(&self, name: &str) -> Result<&GraphNode, FlowError> {
        let idx = self
            .node_index_map
            .get(name)
            .ok_or_else(|| FlowError::NodeNotFound(name.to_string()))?;
        self.graph
            .node_weight(*idx)
            .ok_or_else(|| FlowError::NodeNotFound(name.to_string()))
    }

    /// All node names, in insertion order.
    pub fn node_names(&self) -> Vec<String> {
        self.graph
            .node_indices()
            .filter_map(|idx| self.graph.node_weight(idx).map(|n| n.name.clone()))
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Direct upstream dependencies of a node.
    pub fn predecessors(&self, name: &str) -> Result<Vec<String>, FlowError> {
        let idx = self
            .node_index_map
            .get(name)
            .ok_or_else(|| FlowError::NodeNotFound(name.to_string()))?;
        Ok(self
            .graph
            .neighbors_directed(*idx, petgraph::Direction::Incoming)
            .filter_map(|n| self.graph.node_weight(n).map(|node| node.name.clone()))
            .collect())
    }

    /// Direct downstream dependents of a node.
    pub fn successors(&self, name: &str) -> Result<Vec<String>, FlowError> {
        let idx = self
            .node_index_map
            .get(name)
            .ok_or_else(|| FlowError::NodeNotFound(name.to_string()))?;
        Ok(self
            .graph
            .neighbors_directed(*idx, petgraph::Direction::Outgoing)
            .filter_map(|n| self.graph.node_weight(n).map(|node| node.name.clone()))
            .collect())
    }

    /// Every node reachable downstream of `name`, sorted.
    pub fn transitive_dependents(&self, name: &str) -> Result<Vec<String>, FlowError> {
        let idx = self
            .node_index_map
            .get(name)
            .ok_or_else(|| FlowError::NodeNotFound(name.to_string()))?;
        Ok(traversal::transitive_dependents(&self.graph, *idx))
    }

    /// Topological batches: each batch is the maximal set of nodes whose
    /// dependencies all appear in strictly earlier batches. Batches bound
    /// concurrent eligibility; they impose no order between their members.
    pub fn topological_batches(&self) -> Vec<Vec<String>> {
        traversal::topological_batches(&self.graph)
    }
}
