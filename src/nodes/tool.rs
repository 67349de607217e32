use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::collaborator::CollaboratorRegistry;
use crate::dsl::NodeKind;
use crate::error::NodeError;
use crate::graph::GraphNode;

use super::executor::{into_output_map, NodeExecutor, NodeOutput};

/// Executes a tool node: resolves the tool client by identifier and invokes
/// it with the resolved inputs as the argument mapping.
pub struct ToolNodeExecutor {
    collaborators: Arc<CollaboratorRegistry>,
}

impl ToolNodeExecutor {
    pub fn new(collaborators: Arc<CollaboratorRegistry>) -> Self {
        Self { collaborators }
    }
}

#[async_trait]
impl NodeExecutor for ToolNodeExecutor {
    async fn execute(
        &self,
        node: &GraphNode,
        inputs: &HashMap<String, Value>,
    ) -> Result<NodeOutput, NodeError> {
        let NodeKind::Tool { tool } = &node.definition.kind else {
            return Err(NodeError::ConfigError(format!(
                "node '{}' is not a tool node",
                node.name
            )));
        };

        let client = self.collaborators.tool(tool).ok_or_else(|| {
            NodeError::ConfigError(format!("tool '{}' is not registered", tool))
        })?;

        let arguments = Value::Object(
            inputs
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        );

        tracing::debug!(node = %node.name, tool = %tool, "invoking tool");
        let raw = client.invoke(arguments).await?;
        Ok(NodeOutput {
            values: into_output_map(raw, node)?,
            usage: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::{CollaboratorError, ToolClient};
    use crate::dsl::NodeDefinition;
    use crate::graph::OutputCatalog;
    use serde_json::json;
    use std::collections::BTreeMap;

    struct MockTool {
        response: Value,
    }

    #[async_trait]
    impl ToolClient for MockTool {
        async fn invoke(&self, arguments: Value) -> Result<Value, CollaboratorError> {
            if let Some(q) = arguments.get("q").and_then(|v| v.as_str()) {
                let response = self.response.as_str().unwrap_or_default();
                return Ok(json!({ "result": format!("{} for '{}'", response, q) }));
            }
            Ok(self.response.clone())
        }
    }

    fn tool_graph_node(tool: &str, outputs: &[&str]) -> GraphNode {
        GraphNode {
            name: "search".to_string(),
            definition: NodeDefinition {
                name: "search".to_string(),
                kind: NodeKind::Tool {
                    tool: tool.to_string(),
                },
                inputs: BTreeMap::new(),
                outputs: outputs.iter().map(|s| s.to_string()).collect(),
                output_schema: None,
            },
            outputs: OutputCatalog::Known(outputs.iter().map(|s| s.to_string()).collect()),
        }
    }

    #[tokio::test]
    async fn test_tool_node_basic() {
        let mut collaborators = CollaboratorRegistry::new();
        collaborators.register_tool(
            "web_search",
            Arc::new(MockTool {
                response: json!({ "result": "ok" }),
            }),
        );
        let executor = ToolNodeExecutor::new(Arc::new(collaborators));

        let node = tool_graph_node("web_search", &["result"]);
        let output = executor.execute(&node, &HashMap::new()).await.unwrap();
        assert_eq!(output.values["result"], "ok");
    }

    #[tokio::test]
    async fn test_tool_node_forwards_arguments() {
        let mut collaborators = CollaboratorRegistry::new();
        collaborators.register_tool(
            "web_search",
            Arc::new(MockTool {
                response: json!("hits"),
            }),
        );
        let executor = ToolNodeExecutor::new(Arc::new(collaborators));

        let node = tool_graph_node("web_search", &["result"]);
        let mut inputs = HashMap::new();
        inputs.insert("q".to_string(), json!("product launches"));

        let output = executor.execute(&node, &inputs).await.unwrap();
        assert_eq!(output.values["result"], "hits for 'product launches'");
    }

    #[tokio::test]
    async fn test_tool_node_not_found_failure() {
        struct MissingTool;
        #[async_trait]
        impl ToolClient for MissingTool {
            async fn invoke(&self, _arguments: Value) -> Result<Value, CollaboratorError> {
                Err(CollaboratorError::ToolNotFound("web_search".into()))
            }
        }

        let mut collaborators = CollaboratorRegistry::new();
        collaborators.register_tool("web_search", Arc::new(MissingTool));
        let executor = ToolNodeExecutor::new(Arc::new(collaborators));

        let node = tool_graph_node("web_search", &["result"]);
        let err = executor.execute(&node, &HashMap::new()).await.unwrap_err();
        assert!(matches!(
            err,
            NodeError::Collaborator(CollaboratorError::ToolNotFound(_))
        ));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_tool_node_unregistered() {
        let executor = ToolNodeExecutor::new(Arc::new(CollaboratorRegistry::new()));
        let node = tool_graph_node("ghost", &["result"]);
        let err = executor.execute(&node, &HashMap::new()).await.unwrap_err();
        assert!(matches!(err, NodeError::ConfigError(_)));
    }
}
