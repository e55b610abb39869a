//! Discord message node.
//!
//! Posts a templated message into a channel using a bot token credential.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::{
    Result, WeftError,
    common::Vars,
    executors::{Executor, ExecutorInput, required_secret, required_str, step_name, variable_name},
    model::NodeType,
    template,
};

const DEFAULT_VARIABLE: &str = "discord";
// hard limit imposed by the Discord API
const MAX_MESSAGE_LEN: usize = 2000;

pub struct DiscordExecutor;

#[async_trait]
impl Executor for DiscordExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::Discord
    }

    async fn execute(
        &self,
        input: ExecutorInput<'_>,
    ) -> Result<Vars> {
        let data = &input.node.data;
        let channel_id = required_str(data, "channelId", "Channel is required")?;
        let message = required_str(data, "message", "Message is required")?;
        let mut message = template::interpolate(&message, &input.context);
        if message.chars().count() > MAX_MESSAGE_LEN {
            message = message.chars().take(MAX_MESSAGE_LEN).collect();
        }
        let secret = required_secret(&input).await?;

        let url = format!("https://discord.com/api/v10/channels/{}/messages", channel_id);
        let request = input
            .http
            .post(url)
            .header("Authorization", format!("Bot {}", secret.value))
            .json(&json!({ "content": message }));

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
                            return Err(WeftError::Upstream(format!("Discord request failed with status {}: {}", status.as_u16(), body)));
                        }

                        let body: Value = res.json().await?;
                        Ok(json!({
                            "sent": true,
                            "messageId": body["id"],
                        }))
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
    async fn test_channel_and_message_are_required() {
        let step = MemoryStepRunner::new();
        let secrets = MemSecretStore::new();
        let hub = StatusHub::new();
        let http = reqwest::Client::new();

        let node = NodeModel::new("wf1", "Notify", NodeType::Discord, Vars::new());
        let err = DiscordExecutor
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
        assert_eq!(err.to_string(), "Channel is required");

        let mut data = Vars::new();
        data.set("channelId", "123");
        let node = NodeModel::new("wf1", "Notify", NodeType::Discord, data);
        let err = DiscordExecutor
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
    }
}
