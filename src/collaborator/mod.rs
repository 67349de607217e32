//! External collaborator boundary: the traits nodes call through, and the
//! run-scoped registry that resolves identifiers to implementations.
//!
//! Collaborators are registered before graph build; a node referencing an
//! unregistered identifier fails the build. The registry is an explicit
//! object handed to the executor, never process-wide state.

pub mod error;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::dsl::{LlmParams, LlmUsage};

pub use error::CollaboratorError;

// ================================
// Boundary traits
// ================================

/// A registered callable invoked by function nodes. Receives the node's
/// resolved inputs and returns a JSON object mapping output names to values.
#[async_trait]
pub trait FunctionCollaborator: Send + Sync {
    async fn call(&self, inputs: HashMap<String, Value>) -> Result<Value, CollaboratorError>;
}

/// A tool-invocation client, registered under the tool identifier it serves.
/// Receives the node's resolved inputs as an argument object.
#[async_trait]
pub trait ToolClient: Send + Sync {
    async fn invoke(&self, arguments: Value) -> Result<Value, CollaboratorError>;
}

/// One prompt sent across the LLM boundary: the rendered text plus an
/// optional JSON-Schema response constraint derived from the node's output
/// schema.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub prompt: String,
    pub response_schema: Option<Value>,
    pub params: LlmParams,
}

/// The LLM's reply: a schema-conformant structured value when a constraint
/// was supplied, otherwise plain text as a JSON string.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub value: Value,
    pub usage: Option<LlmUsage>,
}

/// An LLM client. Model selection, token accounting and billing are the
/// client's concern; the engine supplies the prompt and the constraint.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, CollaboratorError>;
}

// ================================
// Function adapter
// ================================

/// Adapts a plain closure into a [`FunctionCollaborator`], so leaf utilities
/// register without hand-writing a trait impl.
pub struct FnCollaborator<F>(F);

impl<F> FnCollaborator<F>
where
    F: Fn(HashMap<String, Value>) -> Result<Value, CollaboratorError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        FnCollaborator(f)
    }
}

#[async_trait]
impl<F> FunctionCollaborator for FnCollaborator<F>
where
    F: Fn(HashMap<String, Value>) -> Result<Value, CollaboratorError> + Send + Sync,
{
    async fn call(&self, inputs: HashMap<String, Value>) -> Result<Value, CollaboratorError> {
        (self.0)(inputs)
    }
}

// ================================
// Registry
// ================================

/// Registry of collaborators for one run, keyed by identifier.
#[derive(Default)]
pub struct CollaboratorRegistry {
    functions: HashMap<String, Arc<dyn FunctionCollaborator>>,
    tools: HashMap<String, Arc<dyn ToolClient>>,
    llms: HashMap<String, Arc<dyn LlmClient>>,
}

impl CollaboratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_function(&mut self, name: &str, function: Arc<dyn FunctionCollaborator>) {
        self.functions.insert(name.to_string(), function);
    }

    /// Register a plain closure as a function collaborator.
    pub fn register_fn<F>(&mut self, name: &str, f: F)
    where
        F: Fn(HashMap<String, Value>) -> Result<Value, CollaboratorError> + Send + Sync + 'static,
    {
        self.register_function(name, Arc::new(FnCollaborator::new(f)));
    }

    pub fn register_tool(&mut self, identifier: &str, tool: Arc<dyn ToolClient>) {
        self.tools.insert(identifier.to_string(), tool);
    }

    pub fn register_llm(&mut self, id: &str, client: Arc<dyn LlmClient>) {
        self.llms.insert(id.to_string(), client);
    }

    pub fn function(&self, name: &str) -> Option<Arc<dyn FunctionCollaborator>> {
        self.functions.get(name).cloned()
    }

    pub fn tool(&self, identifier: &str) -> Option<Arc<dyn ToolClient>> {
        self.tools.get(identifier).cloned()
    }

    pub fn llm(&self, id: &str) -> Option<Arc<dyn LlmClient>> {
        self.llms.get(id).cloned()
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn has_tool(&self, identifier: &str) -> bool {
        self.tools.contains_key(identifier)
    }

    pub fn has_llm(&self, id: &str) -> bool {
        self.llms.contains_key(id)
    }
}
