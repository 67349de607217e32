use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::stable_graph::NodeIndex;

use super::types::FlowGraph;

/// Layer the graph into topological batches. Every node's dependencies land
/// in a strictly earlier batch; nodes within a batch are mutually
/// independent. Batch members are sorted by name so the layering is
/// deterministic.
pub fn topological_batches(graph: &FlowGraph) -> Vec<Vec<String>> {
    let mut in_degree: HashMap<NodeIndex, usize> = graph
        .node_indices()
        .map(|idx| {
            (
                idx,
                graph
                    .neighbors_directed(idx, petgraph::Direction::Incoming)
                    .count(),
            )
        })
        .collect();

    let mut batches = Vec::new();
    let mut remaining: usize = graph.node_count();

    while remaining > 0 {
        let ready: Vec<NodeIndex> = in_degree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(idx, _)| *idx)
            .collect();
        // A validated graph is acyclic, so progress is guaranteed; an empty
        // ready set would mean a cycle slipped through.
        if ready.is_empty() {
            break;
        }

        let mut batch: Vec<String> = ready
            .iter()
            .filter_map(|idx| graph.node_weight(*idx).map(|n| n.name.clone()))
            .collect();
        batch.sort();

        for idx in &ready {
            in_degree.remove(idx);
            for succ in graph.neighbors_directed(*idx, petgraph::Direction::Outgoing) {
                if let Some(deg) = in_degree.get_mut(&succ) {
                    *deg = deg.saturating_sub(1);
                }
            }
        }
        remaining -= ready.len();
        batches.push(batch);
    }

    batches
}

/// Every node reachable downstream of `start`, sorted by name.
pub fn transitive_dependents(graph: &FlowGraph, start: NodeIndex) -> Vec<String> {
    let mut visited: HashSet<NodeIndex> = HashSet::new();
    let mut queue: VecDeque<NodeIndex> = VecDeque::new();
    queue.push_back(start);

    while let Some(idx) = queue.pop_front() {
        for succ in graph.neighbors_directed(idx, petgraph::Direction::Outgoing) {
            if visited.insert(succ) {
                queue.push_back(succ);
            }
        }
    }

    let mut names: Vec<String> = visited
        .into_iter()
        .filter_map(|idx| graph.node_weight(idx).map(|n| n.name.clone()))
        .collect();
    names.sort();
    names
}
