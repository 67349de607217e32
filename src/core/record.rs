//! Per-node execution records: the state machine and its audit trail.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::dsl::LlmUsage;

/// Node execution states.
///
/// `Pending → Ready → Running → {Succeeded | Failed}`; `Skipped` is reached
/// without running, for dependents of a failure or nodes cut off by a
/// run-level timeout or abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Pending,
    Ready,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl NodeState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NodeState::Succeeded | NodeState::Failed | NodeState::Skipped
        )
    }
}

/// Why a node was skipped without being invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "cause")]
pub enum SkipCause {
    /// A transitive upstream dependency failed.
    UpstreamFailed { node: String },
    /// The run-level timeout fired before the node was dispatched.
    RunTimeout,
    /// The fail-fast policy stopped scheduling after an unrelated failure.
    RunAborted,
}

impl std::fmt::Display for SkipCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipCause::UpstreamFailed { node } => write!(f, "upstream node '{}' failed", node),
            SkipCause::RunTimeout => write!(f, "run timeout"),
            SkipCause::RunAborted => write!(f, "run aborted"),
        }
    }
}

/// Everything recorded about one node during a run.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionRecord {
    pub node: String,
    pub state: NodeState,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Inputs as resolved at dispatch time.
    pub inputs: HashMap<String, Value>,
    /// Validated outputs, present only on success.
    pub outputs: HashMap<String, Value>,
    /// Execution attempts, counting retries.
    pub attempts: u32,
    pub error: Option<String>,
    pub skip_cause: Option<SkipCause>,
    pub usage: Option<LlmUsage>,
}

impl ExecutionRecord {
    pub fn pending(node: impl Into<String>) -> Self {
        ExecutionRecord {
            node: node.into(),
            state: NodeState::Pending,
            started_at: None,
            finished_at: None,
            inputs: HashMap::new(),
            outputs: HashMap::new(),
            attempts: 0,
            error: None,
            skip_cause: None,
            usage: None,
        }
    }

    pub fn skip(&mut self, cause: SkipCause) {
        self.state = NodeState::Skipped;
        self.error = Some(cause.to_string());
        self.skip_cause = Some(cause);
    }
}
