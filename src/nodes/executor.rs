use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::collaborator::CollaboratorRegistry;
use crate::dsl::LlmUsage;
use crate::error::NodeError;
use crate::graph::GraphNode;
use crate::schema::SchemaRegistry;
use crate::template::Renderer;

/// Raw result of one node execution, before output validation.
#[derive(Debug, Default)]
pub struct NodeOutput {
    pub values: HashMap<String, Value>,
    pub usage: Option<LlmUsage>,
}

/// Trait for node execution. Each node kind implements this.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    /// Execute the node against its resolved inputs, returning the raw
    /// output mapping.
    async fn execute(
        &self,
        node: &GraphNode,
        inputs: &HashMap<String, Value>,
    ) -> Result<NodeOutput, NodeError>;
}

/// Registry of node executors by kind tag.
pub struct NodeExecutorRegistry {
    executors: HashMap<String, Arc<dyn NodeExecutor>>,
}

impl NodeExecutorRegistry {
    /// Create a registry with the built-in executors for the three node
    /// kinds, all backed by the given collaborator registry.
    pub fn new(collaborators: Arc<CollaboratorRegistry>, schemas: Arc<SchemaRegistry>) -> Self {
        let mut registry = NodeExecutorRegistry {
            executors: HashMap::new(),
        };
        registry.register(
            "function",
            Arc::new(super::function::FunctionNodeExecutor::new(
                collaborators.clone(),
            )),
        );
        registry.register(
            "prompt",
            Arc::new(super::prompt::PromptNodeExecutor::new(
                collaborators.clone(),
                schemas,
                Renderer::new(),
            )),
        );
        registry.register(
            "tool",
            Arc::new(super::tool::ToolNodeExecutor::new(collaborators)),
        );
        registry
    }

    pub fn register(&mut self, tag: &str, executor: Arc<dyn NodeExecutor>) {
        self.executors.insert(tag.to_string(), executor);
    }

    pub fn get(&self, tag: &str) -> Option<Arc<dyn NodeExecutor>> {
        self.executors.get(tag).cloned()
    }

    pub fn registered_tags(&self) -> Vec<String> {
        self.executors.keys().cloned().collect()
    }
}

/// Shape a collaborator's raw return value into an output mapping. Objects
/// map directly; any other value lands under the node's single declared
/// output.
pub(crate) fn into_output_map(
    raw: Value,
    node: &GraphNode,
) -> Result<HashMap<String, Value>, NodeError> {
    match raw {
        Value::Object(map) => Ok(map.into_iter().collect()),
        other => {
            let outputs = node.outputs.names();
            match outputs {
                [single] => {
                    let mut map = HashMap::new();
                    map.insert(single.clone(), other);
                    Ok(map)
                }
                _ => Err(NodeError::ExecutionError(format!(
                    "node '{}' returned a non-object result but declares {} outputs",
                    node.name,
                    outputs.len()
                ))),
            }
        }
    }
}
