//! Final run report: per-node records plus the archived run context.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::dsl::LlmUsage;

use super::record::{ExecutionRecord, NodeState};

/// Terminal status of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    Failed,
}

/// Everything a caller learns about a finished run. A partially failed run
/// still carries the succeeded branches' outputs.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub flow: String,
    pub status: RunStatus,
    pub records: BTreeMap<String, ExecutionRecord>,
    /// Archived run-context snapshot, keyed `node.output`.
    pub context: BTreeMap<String, Value>,
    /// Aggregated LLM usage across all prompt nodes.
    pub usage: LlmUsage,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    pub fn record(&self, node: &str) -> Option<&ExecutionRecord> {
        self.records.get(node)
    }

    pub fn state(&self, node: &str) -> Option<NodeState> {
        self.records.get(node).map(|r| r.state)
    }

    /// A node output from the archived context.
    pub fn output(&self, node: &str, output: &str) -> Option<&Value> {
        self.context.get(&format!("{}.{}", node, output))
    }
}
