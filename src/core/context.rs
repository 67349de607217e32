//! Run context: the write-once store node outputs flow through.
//!
//! Keys are `(node, output)` pairs packed as `node\0output`. Each key is
//! written exactly once per run; a second write is an internal invariant
//! violation, not a recoverable condition.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::dsl::RUN_INPUT_NODE;
use crate::error::FlowError;

/// Address of a single node output: `(node, output)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector {
    node: String,
    output: String,
}

impl Selector {
    pub fn new(node: impl Into<String>, output: impl Into<String>) -> Self {
        Selector {
            node: node.into(),
            output: output.into(),
        }
    }

    /// Selector for a caller-supplied run input.
    pub fn run_input(name: impl Into<String>) -> Self {
        Selector::new(RUN_INPUT_NODE, name)
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn output(&self) -> &str {
        &self.output
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.node, self.output)
    }
}

/// Per-run store mapping `(node, output)` to a validated value.
#[derive(Debug, Default)]
pub struct RunContext {
    values: HashMap<String, Value>,
}

impl RunContext {
    pub fn new() -> Self {
        RunContext {
            values: HashMap::new(),
        }
    }

    /// Build the storage key for a node output.
    fn make_key(node: &str, output: &str) -> String {
        let mut key = String::with_capacity(node.len() + 1 + output.len());
        key.push_str(node);
        key.push('\0');
        key.push_str(output);
        key
    }

    /// Write a value. Each key accepts exactly one write per run.
    pub fn set(&mut self, selector: &Selector, value: Value) -> Result<(), FlowError> {
        let key = Self::make_key(&selector.node, &selector.output);
        if self.values.contains_key(&key) {
            return Err(FlowError::DuplicateWrite {
                node: selector.node.clone(),
                output: selector.output.clone(),
            });
        }
        self.values.insert(key, value);
        Ok(())
    }

    pub fn get(&self, selector: &Selector) -> Option<&Value> {
        self.values
            .get(&Self::make_key(&selector.node, &selector.output))
    }

    pub fn has(&self, selector: &Selector) -> bool {
        self.values
            .contains_key(&Self::make_key(&selector.node, &selector.output))
    }

    /// Write all of a node's outputs.
    pub fn set_node_outputs(
        &mut self,
        node: &str,
        outputs: &HashMap<String, Value>,
    ) -> Result<(), FlowError> {
        for (output, value) in outputs {
            self.set(&Selector::new(node, output), value.clone())?;
        }
        Ok(())
    }

    /// Seed caller-supplied run inputs under the reserved `inputs` node.
    pub fn seed_run_inputs(&mut self, inputs: &HashMap<String, Value>) -> Result<(), FlowError> {
        for (name, value) in inputs {
            self.set(&Selector::run_input(name), value.clone())?;
        }
        Ok(())
    }

    /// All outputs recorded for a node.
    pub fn node_outputs(&self, node: &str) -> HashMap<String, Value> {
        let mut prefix = String::with_capacity(node.len() + 1);
        prefix.push_str(node);
        prefix.push('\0');
        self.values
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, val)| {
                key.split_once('\0')
                    .map(|(_, output)| (output.to_string(), val.clone()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Snapshot the whole context with human-readable `node.output` keys.
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.values
            .iter()
            .filter_map(|(key, val)| {
                key.split_once('\0')
                    .map(|(node, output)| (format!("{}.{}", node, output), val.clone()))
            })
            .collect()
    }
}
