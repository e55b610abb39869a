//! OpenAI chat completion node.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::{
    Result, WeftError,
    common::Vars,
    executors::{Executor, ExecutorInput, required_secret, required_str, step_name, variable_name},
    model::NodeType,
    template,
};

const DEFAULT_VARIABLE: &str = "openai";
const DEFAULT_MODEL: &str = "gpt-4o";
const API_URL: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenaiExecutor;

#[async_trait]
impl Executor for OpenaiExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::Openai
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

        let request = input
            .http
            .post(API_URL)
            .bearer_auth(secret.value)
            .json(&json!({
                "model": model,
                "messages": [{ "role": "user", "content": prompt }],
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
                            return Err(WeftError::Upstream(format!("OpenAI request failed with status {}: {}", status.as_u16(), body)));
                        }

                        let body: Value = res.json().await?;
                        let content = body["choices"][0]["message"]["content"]
                            .as_str()
                            .ok_or_else(|| WeftError::Upstream("OpenAI response missing message content".to_string()))?;
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
