//! HTTP request node.
//!
//! Calls an arbitrary endpoint with templated url, headers and body, parses
//! the response, and stores it under the node's output variable. Every
//! response is also appended to the run-internal `allHttpResponses` list,
//! which the coordinator strips from the final result.

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Value, json};

use crate::{
    Result, WeftError,
    common::Vars,
    executors::{ALL_RESPONSES_KEY, Executor, ExecutorInput, required_str, step_name, variable_name},
    model::NodeType,
    template,
};

const DEFAULT_VARIABLE: &str = "response";

pub struct HttpRequestExecutor;

impl HttpRequestExecutor {
    fn parse_headers(
        data: &Vars,
        context: &Vars,
    ) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        let configured = match data.get_value("headers") {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map.clone()),
            Some(Value::String(raw)) => {
                let parsed: Value = serde_json::from_str(raw).map_err(|e| WeftError::Validation(format!("headers is not a JSON object: {}", e)))?;
                match parsed {
                    Value::Object(map) => Some(map),
                    _ => return Err(WeftError::Validation("headers is not a JSON object".to_string())),
                }
            }
            Some(_) => return Err(WeftError::Validation("headers is not a JSON object".to_string())),
        };

        if let Some(map) = configured {
            for (key, value) in map {
                let value = match value {
                    Value::String(s) => template::interpolate(&s, context),
                    other => other.to_string(),
                };
                headers.insert(
                    key.parse::<HeaderName>().map_err(|e| WeftError::Validation(format!("invalid header name {}: {}", key, e)))?,
                    value.parse::<HeaderValue>().map_err(|e| WeftError::Validation(format!("invalid header value for {}: {}", key, e)))?,
                );
            }
        }

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn render_body(
        data: &Vars,
        context: &Vars,
    ) -> Option<String> {
        match data.get_value("body") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(template::interpolate(s, context)),
            Some(other) => Some(template::interpolate(&other.to_string(), context)),
        }
    }
}

#[async_trait]
impl Executor for HttpRequestExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::HttpRequest
    }

    async fn execute(
        &self,
        input: ExecutorInput<'_>,
    ) -> Result<Vars> {
        let data = &input.node.data;
        let endpoint = required_str(data, "endpoint", "Endpoint is required")?;
        let endpoint = template::interpolate(&endpoint, &input.context);

        let method = data.get_str("method").unwrap_or_else(|| "GET".to_string()).to_uppercase();
        let method: reqwest::Method = method.parse().map_err(|_| WeftError::Validation(format!("unsupported http method {}", method)))?;

        let headers = Self::parse_headers(data, &input.context)?;

        let mut request = input.http.request(method.clone(), &endpoint).headers(headers);
        if matches!(method, reqwest::Method::POST | reqwest::Method::PUT | reqwest::Method::PATCH) {
            if let Some(body) = Self::render_body(data, &input.context) {
                request = request.body(body);
            }
        }

        let response = input
            .step
            .run(
                &step_name(input.node),
                Box::new(move || {
                    Box::pin(async move {
                        let res = request.send().await?;
                        let status = res.status();
                        if !status.is_success() {
                            return Err(WeftError::Upstream(format!("HTTP request failed with status {}", status.as_u16())));
                        }

                        let is_json = res
                            .headers()
                            .get(CONTENT_TYPE)
                            .and_then(|v| v.to_str().ok())
                            .is_some_and(|v| v.contains("application/json"));

                        let text = res.text().await?;
                        if is_json {
                            serde_json::from_str::<Value>(&text).map_err(|e| WeftError::Upstream(format!("invalid JSON response: {}", e)))
                        } else {
                            Ok(Value::String(text))
                        }
                    })
                }),
            )
            .await?;

        let variable = variable_name(data, DEFAULT_VARIABLE);

        let mut all = match input.context.get_value(ALL_RESPONSES_KEY) {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        all.push(json!({ "variableName": variable, "data": response.clone() }));

        let mut context = input.context;
        context.set(variable, response);
        context.set(ALL_RESPONSES_KEY, Value::Array(all));
        Ok(context)
    }
}
