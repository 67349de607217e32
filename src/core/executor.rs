//! The flow executor — the main execution driver.
//!
//! Walks the dependency graph, dispatching every ready node as a tokio task,
//! applying the retry policy around collaborator work, validating outputs
//! into the write-once run context, and skipping the dependents of failures.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::task::JoinSet;

use crate::collaborator::CollaboratorRegistry;
use crate::dsl::{InputBinding, LlmUsage};
use crate::error::{FlowError, NodeError};
use crate::graph::{Graph, GraphNode};
use crate::nodes::{NodeExecutor, NodeExecutorRegistry, NodeOutput};
use crate::schema::SchemaRegistry;

use super::context::{RunContext, Selector};
use super::record::{ExecutionRecord, NodeState, SkipCause};
use super::report::{RunReport, RunStatus};
use super::retry::RetryPolicy;

/// What happens to not-yet-started work when a node fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Only the failed branch stops; independent branches run to completion.
    LetSiblingsFinish,
    /// No new node is dispatched after the first failure.
    FailFast,
}

/// Configuration for the flow executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Wall-clock budget for the whole run. `None` means unbounded.
    pub run_timeout: Option<Duration>,
    /// Maximum concurrently running nodes. `0` means unbounded.
    pub max_concurrency: usize,
    pub retry: RetryPolicy,
    pub failure_policy: FailurePolicy,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            run_timeout: None,
            max_concurrency: 0,
            retry: RetryPolicy::default(),
            failure_policy: FailurePolicy::LetSiblingsFinish,
        }
    }
}

/// Executes validated graphs. One executor may serve many runs; all run
/// state lives in the run itself.
pub struct FlowExecutor {
    executors: Arc<NodeExecutorRegistry>,
    schemas: Arc<SchemaRegistry>,
    config: ExecutorConfig,
}

struct TaskOutcome {
    node: String,
    result: Result<NodeOutput, NodeError>,
    attempts: u32,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

/// Mutable state owned by one run.
struct RunState {
    records: BTreeMap<String, ExecutionRecord>,
    context: RunContext,
    aborted: bool,
    timed_out: bool,
}

impl RunState {
    fn new(graph: &Graph) -> Self {
        let records = graph
            .node_names()
            .into_iter()
            .map(|name| (name.clone(), ExecutionRecord::pending(name)))
            .collect();
        RunState {
            records,
            context: RunContext::new(),
            aborted: false,
            timed_out: false,
        }
    }

    fn state(&self, node: &str) -> Option<NodeState> {
        self.records.get(node).map(|r| r.state)
    }

    fn all_terminal(&self) -> bool {
        self.records.values().all(|r| r.state.is_terminal())
    }

    /// Pending nodes whose upstream dependencies have all succeeded become
    /// ready.
    fn promote_ready(&mut self, graph: &Graph) -> Result<(), FlowError> {
        let pending: Vec<String> = self
            .records
            .values()
            .filter(|r| r.state == NodeState::Pending)
            .map(|r| r.node.clone())
            .collect();
        for name in pending {
            let deps_met = graph
                .predecessors(&name)?
                .iter()
                .all(|dep| self.state(dep) == Some(NodeState::Succeeded));
            if deps_met {
                if let Some(record) = self.records.get_mut(&name) {
                    record.state = NodeState::Ready;
                }
            }
        }
        Ok(())
    }

    fn ready_nodes(&self) -> Vec<String> {
        self.records
            .values()
            .filter(|r| r.state == NodeState::Ready)
            .map(|r| r.node.clone())
            .collect()
    }

    /// Record a node failure and skip everything downstream of it.
    fn fail_node(
        &mut self,
        graph: &Graph,
        node: &str,
        error: &NodeError,
        policy: FailurePolicy,
    ) -> Result<(), FlowError> {
        tracing::warn!(node = %node, error = %error, "node failed");
        let record = self
            .records
            .get_mut(node)
            .ok_or_else(|| FlowError::NodeNotFound(node.to_string()))?;
        record.state = NodeState::Failed;
        record.error = Some(error.to_string());

        for dependent in graph.transitive_dependents(node)? {
            if let Some(record) = self.records.get_mut(&dependent) {
                if !record.state.is_terminal() && record.state != NodeState::Running {
                    record.skip(SkipCause::UpstreamFailed {
                        node: node.to_string(),
                    });
                }
            }
        }

        if policy == FailurePolicy::FailFast {
            self.aborted = true;
            self.skip_undispatched(SkipCause::RunAborted);
        }
        Ok(())
    }

    /// Skip every node that has not been dispatched yet.
    fn skip_undispatched(&mut self, cause: SkipCause) {
        for record in self.records.values_mut() {
            if matches!(record.state, NodeState::Pending | NodeState::Ready) {
                record.skip(cause.clone());
            }
        }
    }
}

impl FlowExecutor {
    /// Create an executor over the given collaborator and schema registries.
    pub fn new(collaborators: Arc<CollaboratorRegistry>, schemas: Arc<SchemaRegistry>) -> Self {
        FlowExecutor {
            executors: Arc::new(NodeExecutorRegistry::new(collaborators, schemas.clone())),
            schemas,
            config: ExecutorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the graph to completion or failure.
    ///
    /// The caller supplies exactly the run inputs the flow declares. The
    /// returned report carries every node's execution record and the
    /// archived run context, whatever the outcome.
    pub async fn run(
        &self,
        graph: &Graph,
        run_inputs: HashMap<String, Value>,
    ) -> Result<RunReport, FlowError> {
        for declared in &graph.run_inputs {
            if !run_inputs.contains_key(declared) {
                return Err(FlowError::MissingRunInput(declared.clone()));
            }
        }
        for supplied in run_inputs.keys() {
            if !graph.run_inputs.contains(supplied) {
                return Err(FlowError::UndeclaredRunInput(supplied.clone()));
            }
        }

        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        tracing::info!(run_id = %run_id, flow = %graph.name, nodes = graph.node_count(), "run started");

        let mut state = RunState::new(graph);
        state.context.seed_run_inputs(&run_inputs)?;

        let mut tasks: JoinSet<TaskOutcome> = JoinSet::new();
        let mut task_nodes: HashMap<tokio::task::Id, String> = HashMap::new();
        let deadline = self
            .config
            .run_timeout
            .map(|t| tokio::time::Instant::now() + t);

        loop {
            if !state.aborted && !state.timed_out {
                self.dispatch_ready(graph, &mut state, &mut tasks, &mut task_nodes)?;
            }

            if tasks.is_empty() {
                break;
            }

            let sleep_deadline = deadline
                .unwrap_or_else(|| tokio::time::Instant::now() + Duration::from_secs(86_400));
            tokio::select! {
                joined = tasks.join_next_with_id() => {
                    let Some(joined) = joined else { continue };
                    match joined {
                        Ok((id, outcome)) => {
                            task_nodes.remove(&id);
                            self.handle_outcome(graph, &mut state, outcome)?;
                        }
                        Err(join_err) => {
                            // A panicked collaborator fails its node like any
                            // other execution error.
                            let node = task_nodes
                                .remove(&join_err.id())
                                .ok_or_else(|| FlowError::Internal(join_err.to_string()))?;
                            let error = NodeError::ExecutionError(format!(
                                "node task aborted: {}",
                                join_err
                            ));
                            if let Some(record) = state.records.get_mut(&node) {
                                record.finished_at = Some(Utc::now());
                            }
                            state.fail_node(graph, &node, &error, self.config.failure_policy)?;
                        }
                    }
                }
                _ = tokio::time::sleep_until(sleep_deadline), if deadline.is_some() && !state.timed_out => {
                    tracing::warn!(run_id = %run_id, "run timeout: skipping undispatched nodes");
                    state.timed_out = true;
                    state.skip_undispatched(SkipCause::RunTimeout);
                }
            }
        }

        // A validated DAG always drains; anything non-terminal here means
        // scheduling was cut short.
        if !state.all_terminal() {
            state.skip_undispatched(SkipCause::RunAborted);
        }

        let succeeded = state
            .records
            .values()
            .all(|r| r.state == NodeState::Succeeded);
        let status = if succeeded {
            RunStatus::Succeeded
        } else {
            RunStatus::Failed
        };

        let mut usage = LlmUsage::default();
        for record in state.records.values() {
            if let Some(u) = &record.usage {
                usage.add(u);
            }
        }

        let finished_at = Utc::now();
        tracing::info!(run_id = %run_id, status = ?status, "run finished");

        Ok(RunReport {
            run_id,
            flow: graph.name.clone(),
            status,
            records: state.records,
            context: state.context.snapshot(),
            usage,
            started_at,
            finished_at,
        })
    }

    /// Promote pending nodes and spawn every ready node capacity allows.
    fn dispatch_ready(
        &self,
        graph: &Graph,
        state: &mut RunState,
        tasks: &mut JoinSet<TaskOutcome>,
        task_nodes: &mut HashMap<tokio::task::Id, String>,
    ) -> Result<(), FlowError> {
        state.promote_ready(graph)?;

        for name in state.ready_nodes() {
            if self.config.max_concurrency > 0 && tasks.len() >= self.config.max_concurrency {
                break;
            }
            // A failure earlier in this loop may have skipped nodes that were
            // ready when the list was taken.
            if state.state(&name) != Some(NodeState::Ready) {
                continue;
            }

            let node = graph.node(&name)?.clone();
            let inputs = match resolve_inputs(&node, &state.context) {
                Ok(inputs) => inputs,
                Err(err) => {
                    if let Some(record) = state.records.get_mut(&name) {
                        record.finished_at = Some(Utc::now());
                    }
                    state.fail_node(graph, &name, &err, self.config.failure_policy)?;
                    continue;
                }
            };

            let tag = node.definition.kind.tag();
            let executor = self
                .executors
                .get(tag)
                .ok_or_else(|| FlowError::Internal(format!("no executor for kind '{}'", tag)))?;

            let record = state
                .records
                .get_mut(&name)
                .ok_or_else(|| FlowError::NodeNotFound(name.clone()))?;
            record.state = NodeState::Running;
            record.started_at = Some(Utc::now());
            record.inputs = inputs.clone();
            tracing::debug!(node = %name, kind = %tag, "node dispatched");

            let schemas = self.schemas.clone();
            let retry = self.config.retry.clone();
            let handle = tasks.spawn(async move {
                run_node(executor, node, inputs, schemas, retry).await
            });
            task_nodes.insert(handle.id(), name);
        }

        Ok(())
    }

    fn handle_outcome(
        &self,
        graph: &Graph,
        state: &mut RunState,
        outcome: TaskOutcome,
    ) -> Result<(), FlowError> {
        let record = state
            .records
            .get_mut(&outcome.node)
            .ok_or_else(|| FlowError::NodeNotFound(outcome.node.clone()))?;
        record.attempts = outcome.attempts;
        record.started_at = Some(outcome.started_at);
        record.finished_at = Some(outcome.finished_at);

        match outcome.result {
            Ok(output) => {
                state.context.set_node_outputs(&outcome.node, &output.values)?;
                if let Some(record) = state.records.get_mut(&outcome.node) {
                    record.outputs = output.values;
                    record.usage = output.usage;
                    record.state = NodeState::Succeeded;
                }
                tracing::debug!(node = %outcome.node, attempts = outcome.attempts, "node succeeded");
            }
            Err(err) => {
                state.fail_node(graph, &outcome.node, &err, self.config.failure_policy)?;
            }
        }
        Ok(())
    }
}

/// Resolve a node's declared input bindings against the run context.
fn resolve_inputs(
    node: &GraphNode,
    context: &RunContext,
) -> Result<HashMap<String, Value>, NodeError> {
    let mut resolved = HashMap::new();
    for (input, binding) in &node.definition.inputs {
        let value = match binding {
            InputBinding::Literal { value } => value.clone(),
            InputBinding::Reference { from } => {
                let [source, output] = from.as_slice() else {
                    return Err(NodeError::ConfigError(format!(
                        "input '{}' has a malformed selector",
                        input
                    )));
                };
                let selector = Selector::new(source.clone(), output.clone());
                context
                    .get(&selector)
                    .cloned()
                    .ok_or_else(|| NodeError::MissingInput {
                        input: input.clone(),
                        reference: selector.to_string(),
                    })?
            }
        };
        resolved.insert(input.clone(), value);
    }
    Ok(resolved)
}

/// Execute one node with retries, then validate its output.
async fn run_node(
    executor: Arc<dyn NodeExecutor>,
    node: GraphNode,
    inputs: HashMap<String, Value>,
    schemas: Arc<SchemaRegistry>,
    retry: RetryPolicy,
) -> TaskOutcome {
    let started_at = Utc::now();
    let mut attempts = 0u32;
    let result = loop {
        attempts += 1;
        match execute_once(executor.as_ref(), &node, &inputs, &schemas).await {
            Ok(output) => break Ok(output),
            Err(err) => match retry.next_delay(attempts, &err) {
                Some(delay) => {
                    tracing::warn!(
                        node = %node.name,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => break Err(err),
            },
        }
    };

    TaskOutcome {
        node: node.name.clone(),
        result,
        attempts,
        started_at,
        finished_at: Utc::now(),
    }
}

/// One attempt: execute, then pass raw output through the declared schema or
/// check the declared output names.
async fn execute_once(
    executor: &dyn NodeExecutor,
    node: &GraphNode,
    inputs: &HashMap<String, Value>,
    schemas: &SchemaRegistry,
) -> Result<NodeOutput, NodeError> {
    let mut output = executor.execute(node, inputs).await?;

    match &node.definition.output_schema {
        Some(schema) => {
            let raw = Value::Object(
                output
                    .values
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            );
            let canonical = schemas.validate(schema, &raw)?;
            let Value::Object(map) = canonical else {
                return Err(NodeError::ExecutionError(
                    "schema validation returned a non-object".to_string(),
                ));
            };
            output.values = map.into_iter().collect();
        }
        None => {
            for declared in node.outputs.names() {
                if !output.values.contains_key(declared) {
                    return Err(NodeError::MissingOutput(declared.clone()));
                }
            }
        }
    }

    Ok(output)
}
