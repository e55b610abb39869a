//! Per-node-type executors.
//!
//! Each node kind has one executor. An executor receives the shared run
//! context, performs its side effect inside a durable step, and returns the
//! context extended with its own output variable. Executors never publish
//! status events themselves; the run coordinator brackets every dispatch
//! with `loading` and `success`/`error`.

pub mod anthropic;
pub mod discord;
pub mod gemini;
pub mod http_request;
pub mod openai;
pub mod slack;
pub mod tavily;
pub mod triggers;

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use strum::IntoEnumIterator;

use crate::{
    Result, WeftError,
    common::Vars,
    model::{NodeModel, NodeType},
    secrets::SecretStore,
    status::StatusHub,
    step::StepRunner,
};

pub use anthropic::AnthropicExecutor;
pub use discord::DiscordExecutor;
pub use gemini::GeminiExecutor;
pub use http_request::HttpRequestExecutor;
pub use openai::OpenaiExecutor;
pub use slack::SlackExecutor;
pub use tavily::TavilyExecutor;
pub use triggers::TriggerExecutor;

/// Everything one node dispatch needs.
pub struct ExecutorInput<'a> {
    pub node: &'a NodeModel,
    pub execution_id: &'a str,
    pub owner_id: &'a str,
    /// context accumulated by all previously executed nodes
    pub context: Vars,
    pub step: &'a dyn StepRunner,
    pub secrets: &'a dyn SecretStore,
    /// for intermediate events; the coordinator already brackets the
    /// dispatch with `loading` and the terminal status
    pub hub: &'a StatusHub,
    pub http: &'a reqwest::Client,
}

#[async_trait]
pub trait Executor: Send + Sync {
    /// The node kind this executor handles.
    fn node_type(&self) -> NodeType;

    /// Execute the node and return the extended context.
    async fn execute(
        &self,
        input: ExecutorInput<'_>,
    ) -> Result<Vars>;
}

/// Maps every node kind to its executor.
#[derive(Clone)]
pub struct ExecutorRegistry {
    executors: HashMap<NodeType, Arc<dyn Executor>>,
}

impl Default for ExecutorRegistry {
    /// Registry with the built-in executor for every node kind.
    fn default() -> Self {
        let mut registry = Self {
            executors: HashMap::new(),
        };
        for node_type in NodeType::iter() {
            let executor: Arc<dyn Executor> = match node_type {
                NodeType::Initial | NodeType::ManualTrigger | NodeType::GoogleFormTrigger | NodeType::StripeTrigger => {
                    Arc::new(TriggerExecutor::new(node_type))
                }
                NodeType::HttpRequest => Arc::new(HttpRequestExecutor),
                NodeType::Openai => Arc::new(OpenaiExecutor),
                NodeType::Anthropic => Arc::new(AnthropicExecutor),
                NodeType::Gemini => Arc::new(GeminiExecutor),
                NodeType::Discord => Arc::new(DiscordExecutor),
                NodeType::Slack => Arc::new(SlackExecutor),
                NodeType::Tavily => Arc::new(TavilyExecutor),
            };
            registry.executors.insert(node_type, executor);
        }
        registry
    }
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the executor for its node kind. Used to swap in doubles for
    /// wiring tests and to extend the engine with custom integrations.
    pub fn register(
        &mut self,
        executor: Arc<dyn Executor>,
    ) {
        self.executors.insert(executor.node_type(), executor);
    }

    pub fn get(
        &self,
        node_type: NodeType,
    ) -> Result<Arc<dyn Executor>> {
        self.executors
            .get(&node_type)
            .cloned()
            .ok_or_else(|| WeftError::Registry(format!("no executor registered for node type {}", node_type.as_ref())))
    }
}

/// Context key collecting every HTTP response of the run. Internal
/// bookkeeping, stripped from the final result by the coordinator.
pub(crate) const ALL_RESPONSES_KEY: &str = "allHttpResponses";

/// Durable step name for a node, unique within a run.
pub(crate) fn step_name(node: &NodeModel) -> String {
    format!("{}:{}", node.node_type.as_ref(), node.id)
}

/// Output variable name, with the node kind's default.
pub(crate) fn variable_name(
    data: &Vars,
    default: &str,
) -> String {
    data.get_str("variableName").unwrap_or_else(|| default.to_string())
}

/// Fetch a required string field, failing with the given message.
pub(crate) fn required_str(
    data: &Vars,
    key: &str,
    message: &str,
) -> Result<String> {
    data.get_str(key).ok_or_else(|| WeftError::Validation(message.to_string()))
}

/// Fetch the credential referenced by `credentialId`.
pub(crate) async fn required_secret(input: &ExecutorInput<'_>) -> Result<crate::secrets::Secret> {
    let credential_id = required_str(&input.node.data, "credentialId", "Credential is required")?;
    input.secrets.get(&credential_id, input.owner_id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_covers_every_node_type() {
        let registry = ExecutorRegistry::default();
        for node_type in NodeType::iter() {
            let executor = registry.get(node_type).unwrap();
            assert_eq!(executor.node_type(), node_type);
        }
    }

    #[test]
    fn test_register_overrides_by_node_type() {
        struct Fake;

        #[async_trait]
        impl Executor for Fake {
            fn node_type(&self) -> NodeType {
                NodeType::HttpRequest
            }

            async fn execute(
                &self,
                input: ExecutorInput<'_>,
            ) -> Result<Vars> {
                Ok(input.context)
            }
        }

        let mut registry = ExecutorRegistry::default();
        registry.register(Arc::new(Fake));
        let executor = registry.get(NodeType::HttpRequest).unwrap();
        assert_eq!(executor.node_type(), NodeType::HttpRequest);
    }

    #[test]
    fn test_variable_name_default() {
        let mut data = Vars::new();
        assert_eq!(variable_name(&data, "response"), "response");
        data.set("variableName", "users");
        assert_eq!(variable_name(&data, "response"), "users");
    }
}
