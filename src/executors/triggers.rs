//! Trigger node executors.
//!
//! Triggers do not perform any work at execution time; the payload that
//! fired the run is already seeded into the context by the coordinator.
//! They still run inside a durable step so a resumed run replays them
//! instead of re-entering.

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    Result,
    common::Vars,
    executors::{Executor, ExecutorInput, step_name},
    model::NodeType,
};

/// Pass-through executor shared by all trigger kinds.
pub struct TriggerExecutor {
    node_type: NodeType,
}

impl TriggerExecutor {
    pub fn new(node_type: NodeType) -> Self {
        debug_assert!(node_type.is_trigger());
        Self {
            node_type,
        }
    }
}

#[async_trait]
impl Executor for TriggerExecutor {
    fn node_type(&self) -> NodeType {
        self.node_type
    }

    async fn execute(
        &self,
        input: ExecutorInput<'_>,
    ) -> Result<Vars> {
        let context = input.context.clone();
        let passed = input
            .step
            .run(
                &step_name(input.node),
                Box::new(move || Box::pin(async move { Ok(Value::from(context)) })),
            )
            .await?;
        Ok(Vars::from(passed))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{model::NodeModel, secrets::MemSecretStore, status::StatusHub, step::MemoryStepRunner};

    #[tokio::test]
    async fn test_trigger_passes_context_through() {
        let node = NodeModel::new("wf1", "Start", NodeType::ManualTrigger, Vars::new());
        let step = MemoryStepRunner::new();
        let secrets = MemSecretStore::new();
        let hub = StatusHub::new();
        let http = reqwest::Client::new();

        let context = Vars::from(json!({"email": "a@b.c"}));
        let executor = TriggerExecutor::new(NodeType::ManualTrigger);
        let out = executor
            .execute(ExecutorInput {
                node: &node,
                execution_id: "exec1",
                owner_id: "user1",
                context: context.clone(),
                step: &step,
                secrets: &secrets,
                hub: &hub,
                http: &http,
            })
            .await
            .unwrap();

        assert_eq!(out, context);
    }
}
