use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::collaborator::{CollaboratorRegistry, LlmRequest};
use crate::dsl::NodeKind;
use crate::error::NodeError;
use crate::graph::GraphNode;
use crate::schema::SchemaRegistry;
use crate::template::Renderer;

use super::executor::{into_output_map, NodeExecutor, NodeOutput};

/// Executes a prompt node: renders the template against the resolved inputs,
/// sends the rendered text to the configured LLM client with the output
/// schema as a response constraint, and returns the parsed structured reply.
pub struct PromptNodeExecutor {
    collaborators: Arc<CollaboratorRegistry>,
    schemas: Arc<SchemaRegistry>,
    renderer: Renderer,
}

impl PromptNodeExecutor {
    pub fn new(
        collaborators: Arc<CollaboratorRegistry>,
        schemas: Arc<SchemaRegistry>,
        renderer: Renderer,
    ) -> Self {
        Self {
            collaborators,
            schemas,
            renderer,
        }
    }
}

#[async_trait]
impl NodeExecutor for PromptNodeExecutor {
    async fn execute(
        &self,
        node: &GraphNode,
        inputs: &HashMap<String, Value>,
    ) -> Result<NodeOutput, NodeError> {
        let NodeKind::Prompt {
            template,
            llm,
            params,
        } = &node.definition.kind
        else {
            return Err(NodeError::ConfigError(format!(
                "node '{}' is not a prompt node",
                node.name
            )));
        };

        let prompt = self.renderer.render(template, inputs)?;

        let response_schema = match &node.definition.output_schema {
            Some(name) => Some(self.schemas.json_schema(name)?),
            None => None,
        };

        let client = self.collaborators.llm(llm).ok_or_else(|| {
            NodeError::ConfigError(format!("llm client '{}' is not registered", llm))
        })?;

        tracing::debug!(node = %node.name, llm = %llm, "dispatching rendered prompt");
        let response = client
            .complete(LlmRequest {
                prompt,
                response_schema,
                params: params.clone(),
            })
            .await?;

        Ok(NodeOutput {
            values: into_output_map(response.value, node)?,
            usage: response.usage,
        })
    }
}
