use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::common::Vars;

/// node id
pub type NodeId = String;

/// Closed enumeration of node kinds a workflow may contain.
///
/// Triggers (`initial`, `manual_trigger`, `google_form_trigger`,
/// `stripe_trigger`) pass the seeded context through; action nodes perform a
/// side effect and extend the context with their output.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString, strum::EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeType {
    /// Placeholder trigger every fresh workflow starts with.
    Initial,
    ManualTrigger,
    GoogleFormTrigger,
    StripeTrigger,
    HttpRequest,
    Openai,
    Anthropic,
    Gemini,
    Discord,
    Slack,
    Tavily,
}

impl NodeType {
    /// whether this node kind is a trigger
    pub fn is_trigger(&self) -> bool {
        matches!(
            self,
            NodeType::Initial | NodeType::ManualTrigger | NodeType::GoogleFormTrigger | NodeType::StripeTrigger
        )
    }

    /// JSON schema for the node's configuration bag.
    ///
    /// Schemas constrain the shape of fields that are present; required
    /// fields are enforced by the executor at run time so that draft
    /// workflows with incomplete configuration can still be saved.
    pub fn config_schema(&self) -> serde_json::Value {
        match self {
            NodeType::Initial | NodeType::ManualTrigger | NodeType::GoogleFormTrigger | NodeType::StripeTrigger => json!({
                "type": "object"
            }),
            NodeType::HttpRequest => json!({
                "type": "object",
                "properties": {
                    "endpoint": { "type": "string", "description": "Request URL, supports {{path}} variables" },
                    "method": { "type": "string", "enum": ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"] },
                    "headers": { "type": ["object", "string"] },
                    "body": {},
                    "variableName": { "type": "string" }
                }
            }),
            NodeType::Openai | NodeType::Anthropic | NodeType::Gemini => json!({
                "type": "object",
                "properties": {
                    "prompt": { "type": "string", "description": "Prompt text, supports {{path}} variables" },
                    "credentialId": { "type": "string" },
                    "model": { "type": "string" },
                    "variableName": { "type": "string" }
                }
            }),
            NodeType::Discord => json!({
                "type": "object",
                "properties": {
                    "credentialId": { "type": "string" },
                    "channelId": { "type": "string" },
                    "message": { "type": "string" },
                    "variableName": { "type": "string" }
                }
            }),
            NodeType::Slack => json!({
                "type": "object",
                "properties": {
                    "credentialId": { "type": "string" },
                    "channel": { "type": "string" },
                    "message": { "type": "string" },
                    "variableName": { "type": "string" }
                }
            }),
            NodeType::Tavily => json!({
                "type": "object",
                "properties": {
                    "credentialId": { "type": "string" },
                    "query": { "type": "string" },
                    "maxResults": { "type": "integer", "minimum": 1 },
                    "variableName": { "type": "string" }
                }
            }),
        }
    }
}

/// 2-D canvas position. A UI concern, irrelevant to execution.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// One configured step in a workflow graph.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NodeModel {
    pub id: NodeId,
    pub workflow_id: String,
    /// display name
    pub name: String,
    /// node kind
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// type-specific configuration (prompt, credential reference, endpoint, ...)
    #[serde(default)]
    pub data: Vars,
    #[serde(default)]
    pub position: Position,
}

impl NodeModel {
    pub fn new(
        workflow_id: impl Into<String>,
        name: impl Into<String>,
        node_type: NodeType,
        data: Vars,
    ) -> Self {
        Self {
            id: crate::utils::longid(),
            workflow_id: workflow_id.into(),
            name: name.into(),
            node_type,
            data,
            position: Position::default(),
        }
    }
}
