use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::collaborator::CollaboratorRegistry;
use crate::dsl::NodeKind;
use crate::error::NodeError;
use crate::graph::GraphNode;

use super::executor::{into_output_map, NodeExecutor, NodeOutput};

/// Executes a function node: looks up the registered callable and invokes it
/// with the resolved inputs as arguments.
pub struct FunctionNodeExecutor {
    collaborators: Arc<CollaboratorRegistry>,
}

impl FunctionNodeExecutor {
    pub fn new(collaborators: Arc<CollaboratorRegistry>) -> Self {
        Self { collaborators }
    }
}

#[async_trait]
impl NodeExecutor for FunctionNodeExecutor {
    async fn execute(
        &self,
        node: &GraphNode,
        inputs: &HashMap<String, Value>,
    ) -> Result<NodeOutput, NodeError> {
        let NodeKind::Function { function } = &node.definition.kind else {
            return Err(NodeError::ConfigError(format!(
                "node '{}' is not a function node",
                node.name
            )));
        };

        // Graph build guarantees registration; a miss here means the
        // registry changed between build and run.
        let callable = self.collaborators.function(function).ok_or_else(|| {
            NodeError::ConfigError(format!("function '{}' is not registered", function))
        })?;

        let raw = callable.call(inputs.clone()).await?;
        Ok(NodeOutput {
            values: into_output_map(raw, node)?,
            usage: None,
        })
    }
}
