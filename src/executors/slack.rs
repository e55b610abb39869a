//! Slack message node.
//!
//! The credential decides the delivery mode: an incoming-webhook url posts
//! straight to the webhook, anything else is treated as a bot token for
//! `chat.postMessage`.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::{
    Result, WeftError,
    common::Vars,
    executors::{Executor, ExecutorInput, required_secret, required_str, step_name, variable_name},
    model::NodeType,
    template,
};

const DEFAULT_VARIABLE: &str = "slack";
const WEBHOOK_PREFIX: &str = "https://hooks.slack.com/";
const POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";

pub struct SlackExecutor;

#[async_trait]
impl Executor for SlackExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::Slack
    }

    async fn execute(
        &self,
        input: ExecutorInput<'_>,
    ) -> Result<Vars> {
        let data = &input.node.data;
        let message = required_str(data, "message", "Message is required")?;
        let message = template::interpolate(&message, &input.context);
        let secret = required_secret(&input).await?;

        let request = if secret.value.starts_with(WEBHOOK_PREFIX) {
            input.http.post(&secret.value).json(&json!({ "text": message }))
        } else {
            let channel = required_str(data, "channel", "Channel is required")?;
            input
                .http
                .post(POST_MESSAGE_URL)
                .bearer_auth(&secret.value)
                .json(&json!({ "channel": channel, "text": message }))
        };
        let webhook = secret.value.starts_with(WEBHOOK_PREFIX);

        let sent = input
            .step
            .run(
                &step_name(input.node),
                Box::new(move || {
                    Box::pin(async move {
                        let res = request.send().await?;
                        let status = res.status();
                        if !status.is_success() {
                            let body = res.text().await.unwrap_or_default();
                            return Err(WeftError::Upstream(format!("Slack request failed with status {}: {}", status.as_u16(), body)));
                        }

                        // chat.postMessage reports failure in-band
                        if !webhook {
                            let body: Value = res.json().await?;
                            if body["ok"] != Value::Bool(true) {
                                let reason = body["error"].as_str().unwrap_or("unknown error");
                                return Err(WeftError::Upstream(format!("Slack API error: {}", reason)));
                            }
                        }
                        Ok(json!({ "sent": true }))
                    })
                }),
            )
            .await?;

        let mut context = input.context;
        context.set(variable_name(data, DEFAULT_VARIABLE), sent);
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::NodeModel, secrets::MemSecretStore, status::StatusHub, step::MemoryStepRunner};

    #[tokio::test]
    async fn test_message_and_credential_are_required() {
        let step = MemoryStepRunner::new();
        let secrets = MemSecretStore::new();
        let hub = StatusHub::new();
        let http = reqwest::Client::new();

        let node = NodeModel::new("wf1", "Notify", NodeType::Slack, Vars::new());
        let err = SlackExecutor
            .execute(ExecutorInput {
                node: &node,
                execution_id: "exec1",
                owner_id: "user1",
                context: Vars::new(),
                step: &step,
                secrets: &secrets,
                hub: &hub,
                http: &http,
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Message is required");

        let mut data = Vars::new();
        data.set("message", "deploy done");
        let node = NodeModel::new("wf1", "Notify", NodeType::Slack, data);
        let err = SlackExecutor
            .execute(ExecutorInput {
                node: &node,
                execution_id: "exec1",
                owner_id: "user1",
                context: Vars::new(),
                step: &step,
                secrets: &secrets,
                hub: &hub,
                http: &http,
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Credential is required");
    }
}
