//! Tavily web search node.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::{
    Result, WeftError,
    common::Vars,
    executors::{Executor, ExecutorInput, required_secret, required_str, step_name, variable_name},
    model::NodeType,
    template,
};

const DEFAULT_VARIABLE: &str = "tavily";
const DEFAULT_MAX_RESULTS: u64 = 5;
const API_URL: &str = "https://api.tavily.com/search";

pub struct TavilyExecutor;

#[async_trait]
impl Executor for TavilyExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::Tavily
    }

    async fn execute(
        &self,
        input: ExecutorInput<'_>,
    ) -> Result<Vars> {
        let data = &input.node.data;
        let query = required_str(data, "query", "Query is required")?;
        let query = template::interpolate(&query, &input.context);
        let max_results = data.get::<u64>("maxResults").unwrap_or(DEFAULT_MAX_RESULTS);
        let secret = required_secret(&input).await?;

        let request = input.http.post(API_URL).json(&json!({
            "api_key": secret.value,
            "query": query,
            "max_results": max_results,
        }));

        let results = input
            .step
            .run(
                &step_name(input.node),
                Box::new(move || {
                    Box::pin(async move {
                        let res = request.send().await?;
                        let status = res.status();
                        if !status.is_success() {
                            let body = res.text().await.unwrap_or_default();
                            return Err(WeftError::Upstream(format!("Tavily request failed with status {}: {}", status.as_u16(), body)));
                        }
                        Ok(res.json::<Value>().await?)
                    })
                }),
            )
            .await?;

        let mut context = input.context;
        context.set(variable_name(data, DEFAULT_VARIABLE), results);
        Ok(context)
    }
}
