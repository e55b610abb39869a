use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    Result, WeftError, graph,
    model::{
        connection::ConnectionModel,
        node::{NodeModel, NodeType},
    },
    utils,
};

/// A user-composed graph of typed nodes and connections.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkflowModel {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub nodes: Vec<NodeModel>,
    #[serde(default)]
    pub connections: Vec<ConnectionModel>,
}

impl WorkflowModel {
    /// Create a fresh workflow containing exactly one `initial` placeholder
    /// trigger node.
    pub fn new(
        owner_id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let id = utils::longid();
        let now = utils::time::time_millis();
        let initial = NodeModel::new(id.clone(), "Initial", NodeType::Initial, Default::default());

        Self {
            id: id.clone(),
            owner_id: owner_id.into(),
            name: name.into(),
            description: description.into(),
            created_at: now,
            updated_at: now,
            nodes: vec![initial],
            connections: Vec::new(),
        }
    }

    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str::<WorkflowModel>(s).map_err(|e| WeftError::Convert(format!("{}", e)))
    }

    /// Replace the node/connection set wholesale, re-validating the result.
    pub fn replace_graph(
        &mut self,
        nodes: Vec<NodeModel>,
        connections: Vec<ConnectionModel>,
    ) -> Result<()> {
        self.nodes = nodes;
        self.connections = connections;
        self.updated_at = utils::time::time_millis();
        self.validate()
    }

    /// Validate the structural invariants of the workflow.
    ///
    /// - connection endpoints must reference nodes of this workflow
    /// - at most one manual-trigger node may exist
    /// - nodes plus connections must form a directed acyclic graph
    /// - node configuration bags must match their type's schema
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(WeftError::Validation("missing id in workflow".into()));
        }

        let node_ids: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        for connection in &self.connections {
            if !node_ids.contains(connection.source_node_id.as_str()) {
                return Err(WeftError::Validation(format!(
                    "connection {} references unknown source node {}",
                    connection.id, connection.source_node_id
                )));
            }
            if !node_ids.contains(connection.target_node_id.as_str()) {
                return Err(WeftError::Validation(format!(
                    "connection {} references unknown target node {}",
                    connection.id, connection.target_node_id
                )));
            }
        }

        let manual_triggers = self.nodes.iter().filter(|n| n.node_type == NodeType::ManualTrigger).count();
        if manual_triggers > 1 {
            return Err(WeftError::Validation("a workflow may contain at most one manual trigger".into()));
        }

        for node in &self.nodes {
            let data = serde_json::Value::from(node.data.clone());
            jsonschema::validate(&node.node_type.config_schema(), &data)
                .map_err(|e| WeftError::Validation(format!("node {} has invalid configuration: {}", node.id, e)))?;
        }

        // cycles are a hard validation failure, not a warning
        graph::order_nodes(&self.nodes, &self.connections)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Vars;

    fn node(
        wf: &WorkflowModel,
        name: &str,
        node_type: NodeType,
    ) -> NodeModel {
        NodeModel::new(wf.id.clone(), name, node_type, Vars::new())
    }

    #[test]
    fn test_fresh_workflow_has_single_initial_node() {
        let wf = WorkflowModel::new("user1", "My flow", "");
        assert_eq!(wf.nodes.len(), 1);
        assert_eq!(wf.nodes[0].node_type, NodeType::Initial);
        assert!(wf.validate().is_ok());
    }

    #[test]
    fn test_at_most_one_manual_trigger() {
        let mut wf = WorkflowModel::new("user1", "flow", "");
        let a = node(&wf, "Trigger A", NodeType::ManualTrigger);
        let b = node(&wf, "Trigger B", NodeType::ManualTrigger);
        assert!(wf.replace_graph(vec![a, b], vec![]).is_err());
    }

    #[test]
    fn test_connection_endpoints_must_exist() {
        let mut wf = WorkflowModel::new("user1", "flow", "");
        let a = node(&wf, "A", NodeType::ManualTrigger);
        let mut conn = ConnectionModel::new(wf.id.clone(), a.id.clone(), "nope");
        conn.target_node_id = "missing".into();
        let err = wf.replace_graph(vec![a], vec![conn]).unwrap_err();
        assert!(matches!(err, WeftError::Validation(_)));
    }

    #[test]
    fn test_cycle_is_hard_failure() {
        let mut wf = WorkflowModel::new("user1", "flow", "");
        let a = node(&wf, "A", NodeType::ManualTrigger);
        let b = node(&wf, "B", NodeType::HttpRequest);
        let ab = ConnectionModel::new(wf.id.clone(), a.id.clone(), b.id.clone());
        let ba = ConnectionModel::new(wf.id.clone(), b.id.clone(), a.id.clone());
        let err = wf.replace_graph(vec![a, b], vec![ab, ba]).unwrap_err();
        assert!(matches!(err, WeftError::Cycle(_)));
    }

    #[test]
    fn test_schema_rejects_wrong_field_type() {
        let mut wf = WorkflowModel::new("user1", "flow", "");
        let mut data = Vars::new();
        data.set("endpoint", 42);
        let bad = NodeModel::new(wf.id.clone(), "Call", NodeType::HttpRequest, data);
        let err = wf.replace_graph(vec![bad], vec![]).unwrap_err();
        assert!(matches!(err, WeftError::Validation(_)));
    }
}
