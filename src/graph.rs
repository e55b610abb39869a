//! Deterministic ordering of a workflow graph.
//!
//! The run coordinator walks nodes strictly one-after-another, so the graph
//! must be flattened into a single linear sequence before anything executes.
//! Multiple valid orderings exist for graphs with independent branches; the
//! contract here is determinism, not a particular interleaving: repeated
//! calls on value-identical input return the identical order.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};

use crate::{
    Result, WeftError,
    model::{ConnectionModel, NodeModel},
};

/// Topologically sort workflow nodes using their connections.
///
/// Every input node appears in the output exactly once, including nodes with
/// no incoming or outgoing connection. For every connection source -> target,
/// the source appears before the target. Fails with [`WeftError::Cycle`] if
/// the graph is not acyclic, before any node executes.
pub fn order_nodes(
    nodes: &[NodeModel],
    connections: &[ConnectionModel],
) -> Result<Vec<NodeModel>> {
    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let mut indices: HashMap<&str, NodeIndex> = HashMap::new();

    // insertion in listing order keeps the sort deterministic
    for (pos, node) in nodes.iter().enumerate() {
        let idx = graph.add_node(pos);
        indices.insert(node.id.as_str(), idx);
    }

    for connection in connections {
        let source = indices
            .get(connection.source_node_id.as_str())
            .ok_or_else(|| WeftError::Validation(format!("connection source node {} not found", connection.source_node_id)))?;
        let target = indices
            .get(connection.target_node_id.as_str())
            .ok_or_else(|| WeftError::Validation(format!("connection target node {} not found", connection.target_node_id)))?;
        graph.add_edge(*source, *target, ());
    }

    let sorted = petgraph::algo::toposort(&graph, None).map_err(|_| WeftError::Cycle("workflow contains a cycle".to_string()))?;

    Ok(sorted.into_iter().map(|idx| nodes[graph[idx]].clone()).collect())
}
