//! # genflow — a DAG execution engine for LLM pipelines
//!
//! `genflow` wires heterogeneous typed steps — plain functions, templated
//! prompts with schema-constrained LLM calls, and external tool invocations —
//! into a directed acyclic graph and runs it to completion or failure:
//!
//! - **Typed nodes**: `function`, `prompt` and `tool` nodes with declared
//!   input bindings and declared outputs, validated at graph build.
//! - **Schema-constrained outputs**: record schemas validate function and
//!   tool results, and project to JSON-Schema response constraints so LLM
//!   replies parse directly into the declared shape.
//! - **Concurrent execution**: every node whose dependencies have succeeded
//!   is dispatched as its own task; independent branches overlap freely.
//! - **Write-once data flow**: node outputs land in a run context keyed by
//!   `(node, output)`; each key is written exactly once per run.
//! - **Failure isolation**: a failed node skips its transitive dependents;
//!   independent branches still finish and report their outputs.
//! - **Centralized retries**: transient collaborator failures (rate limits,
//!   timeouts) retry with backoff under one policy object.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use genflow::{
//!     parse_flow, CollaboratorRegistry, FlowExecutor, FlowFormat, Graph, SchemaRegistry,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let text = std::fs::read_to_string("flow.yaml").unwrap();
//!     let flow = parse_flow(&text, FlowFormat::Yaml).unwrap();
//!
//!     let mut collaborators = CollaboratorRegistry::new();
//!     collaborators.register_fn("read_file", |_inputs| {
//!         Ok(serde_json::json!({ "text": "hello world" }))
//!     });
//!     let collaborators = Arc::new(collaborators);
//!     let schemas = Arc::new(SchemaRegistry::new());
//!
//!     let graph = Graph::build(&flow, &collaborators, &schemas).unwrap();
//!     let executor = FlowExecutor::new(collaborators, schemas);
//!     let report = executor.run(&graph, HashMap::new()).await.unwrap();
//!     println!("{:?}", report.status);
//! }
//! ```

pub mod collaborator;
pub mod core;
pub mod dsl;
pub mod error;
pub mod graph;
pub mod llm;
pub mod nodes;
pub mod schema;
pub mod template;

pub use crate::collaborator::{
    CollaboratorError, CollaboratorRegistry, FnCollaborator, FunctionCollaborator, LlmClient,
    LlmRequest, LlmResponse, ToolClient,
};
pub use crate::core::{
    Backoff, ExecutionRecord, ExecutorConfig, FailurePolicy, FlowExecutor, NodeState, RetryPolicy,
    RunContext, RunReport, RunStatus, Selector, SkipCause,
};
pub use crate::dsl::{
    parse_flow, FlowFormat, FlowSchema, InputBinding, LlmParams, LlmUsage, NodeDefinition,
    NodeKind, RUN_INPUT_NODE,
};
pub use crate::error::{FlowError, GraphError, NodeError};
pub use crate::graph::Graph;
pub use crate::llm::{OpenAiClient, OpenAiConfig};
pub use crate::nodes::{NodeExecutor, NodeExecutorRegistry, NodeOutput};
pub use crate::schema::{
    FieldSpec, FieldType, RecordSchema, SchemaError, SchemaMismatch, SchemaRegistry,
};
pub use crate::template::{Renderer, TemplateError};
