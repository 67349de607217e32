use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// ================================
// Variable Selector
// ================================

/// Variable selector: `["node_name", "output_name"]`. The reserved node name
/// `"inputs"` addresses run inputs supplied by the caller.
pub type VariableSelector = Vec<String>;

/// Reserved node namespace under which run inputs are stored.
pub const RUN_INPUT_NODE: &str = "inputs";

// ================================
// Flow Document Schema
// ================================

/// Current supported flow document version
pub const CURRENT_FLOW_VERSION: &str = "0.1.0";

/// All supported flow document versions
pub const SUPPORTED_FLOW_VERSIONS: &[&str] = &["0.1.0"];

/// A parsed flow document: the declarative surface the engine consumes.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct FlowSchema {
    /// Flow document version string, e.g. "0.1.0"
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub name: String,
    /// Run inputs the caller must supply at run start, referenced by nodes
    /// through the `inputs` namespace.
    #[serde(default)]
    pub inputs: Vec<String>,
    pub nodes: Vec<NodeDefinition>,
}

fn default_version() -> String {
    CURRENT_FLOW_VERSION.to_string()
}

/// A single node: identity, kind-specific config, input bindings and
/// declared outputs.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct NodeDefinition {
    pub name: String,
    /// The `type` field selects the concrete kind; each kind carries a fixed
    /// field set, checked at graph build rather than at dispatch.
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default)]
    pub inputs: BTreeMap<String, InputBinding>,
    /// Declared output names. May be omitted when `output_schema` is set, in
    /// which case the schema's field names are the outputs.
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Name of a registered record schema the node's raw output must satisfy.
    #[serde(default)]
    pub output_schema: Option<String>,
}

/// Kind-specific node configuration.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// Calls a registered function collaborator with the resolved inputs.
    Function { function: String },
    /// Renders the template against the resolved inputs and sends it to a
    /// registered LLM client, constrained by the output schema when declared.
    Prompt {
        template: String,
        #[serde(default = "default_llm")]
        llm: String,
        #[serde(default)]
        params: LlmParams,
    },
    /// Invokes a registered tool client with the resolved argument mapping.
    Tool { tool: String },
}

fn default_llm() -> String {
    "default".to_string()
}

impl NodeKind {
    /// The kind tag used for executor registry lookup.
    pub fn tag(&self) -> &'static str {
        match self {
            NodeKind::Function { .. } => "function",
            NodeKind::Prompt { .. } => "prompt",
            NodeKind::Tool { .. } => "tool",
        }
    }
}

/// Where a node input comes from: an upstream output or a literal constant.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(untagged)]
pub enum InputBinding {
    Reference { from: VariableSelector },
    Literal { value: Value },
}

impl InputBinding {
    pub fn reference(node: impl Into<String>, output: impl Into<String>) -> Self {
        InputBinding::Reference {
            from: vec![node.into(), output.into()],
        }
    }

    pub fn literal(value: Value) -> Self {
        InputBinding::Literal { value }
    }
}

// ================================
// LLM call parameters
// ================================

/// Completion parameters forwarded to the LLM client. Model selection and
/// billing remain the client's concern; these are per-node overrides.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct LlmParams {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<i32>,
}

// ================================
// Usage accounting
// ================================

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct LlmUsage {
    #[serde(default)]
    pub prompt_tokens: i64,
    #[serde(default)]
    pub completion_tokens: i64,
    #[serde(default)]
    pub total_tokens: i64,
}

impl LlmUsage {
    /// Accumulate another usage record into this one.
    pub fn add(&mut self, other: &LlmUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}
