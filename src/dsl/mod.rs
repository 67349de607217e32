//! Flow document surface: serde schema types and the text parser.

pub mod parser;
pub mod schema;

pub use parser::{parse_flow, FlowFormat};
pub use schema::{
    FlowSchema, InputBinding, LlmParams, LlmUsage, NodeDefinition, NodeKind, VariableSelector,
    CURRENT_FLOW_VERSION, RUN_INPUT_NODE, SUPPORTED_FLOW_VERSIONS,
};
