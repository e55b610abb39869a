use serde::{Deserialize, Serialize};

use crate::model::node::NodeId;

/// Directed edge from one node's output slot to another node's input slot.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConnectionModel {
    pub id: String,
    pub workflow_id: String,
    pub source_node_id: NodeId,
    pub target_node_id: NodeId,
    /// source output slot label
    #[serde(default)]
    pub source_output: Option<String>,
    /// target input slot label
    #[serde(default)]
    pub target_input: Option<String>,
}

impl ConnectionModel {
    pub fn new(
        workflow_id: impl Into<String>,
        source_node_id: impl Into<NodeId>,
        target_node_id: impl Into<NodeId>,
    ) -> Self {
        Self {
            id: crate::utils::longid(),
            workflow_id: workflow_id.into(),
            source_node_id: source_node_id.into(),
            target_node_id: target_node_id.into(),
            source_output: None,
            target_input: None,
        }
    }
}
