//! Google Gemini generation node.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::{
    Result, WeftError,
    common::Vars,
    executors::{Executor, ExecutorInput, required_secret, required_str, step_name, variable_name},
    model::NodeType,
    template,
};

const DEFAULT_VARIABLE: &str = "gemini";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

pub struct GeminiExecutor;

#[async_trait]
impl Executor for GeminiExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::Gemini
    }

    async fn execute(
        &self,
        input: ExecutorInput<'_>,
    ) -> Result<Vars> {
        let data = &input.node.data;
        let prompt = required_str(data, "prompt", "Prompt is required")?;
        let prompt = template::interpolate(&prompt, &input.context);
        let model = data.get_str("model").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let secret = required_secret(&input).await?;

        let url = format!("https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent", model);
        let request = input
            .http
            .post(url)
            .header("x-goog-api-key", secret.value)
            .json(&json!({
                "contents": [{ "parts": [{ "text": prompt }] }],
            }));

        let text = input
            .step
            .run(
                &step_name(input.node),
                Box::new(move || {
                    Box::pin(async move {
                        let res = request.send().await?;
                        let status = res.status();
                        if !status.is_success() {
                            let body = res.text().await.unwrap_or_default();
                            return Err(WeftError::Upstream(format!("Gemini request failed with status {}: {}", status.as_u16(), body)));
                        }

                        let body: Value = res.json().await?;
                        let content = body["candidates"][0]["content"]["parts"][0]["text"]
                            .as_str()
                            .ok_or_else(|| WeftError::Upstream("Gemini response missing generated text".to_string()))?;
                        Ok(Value::String(content.to_string()))
                    })
                }),
            )
            .await?;

        let mut context = input.context;
        context.set(variable_name(data, DEFAULT_VARIABLE), text);
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::NodeModel, secrets::MemSecretStore, status::StatusHub, step::MemoryStepRunner};

    #[tokio::test]
    async fn test_credential_is_required() {
        let step = MemoryStepRunner::new();
        let secrets = MemSecretStore::new();
        let hub = StatusHub::new();
        let http = reqwest::Client::new();

        let mut data = Vars::new();
        data.set("prompt", "hello");
        let node = NodeModel::new("wf1", "Generate", NodeType::Gemini, data);
        let err = GeminiExecutor
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
