//! ANTHROPIC_ON_MANAGED_RUNTIME `LlmProvider` (spec §4.5): talks to the
//! Messages API and requests structured output via a single forced tool
//! call when the caller supplies a schema.

use async_trait::async_trait;
use gateway_core::error::{GatewayError, Result};
use gateway_core::llm::{ChatRole, InvokeRequest, InvokeResponse, LlmProvider, ProviderKind};
use gateway_core::schema::to_json_schema;
use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::{Duration, Instant};

static CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .expect("failed to build anthropic http client")
});

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const EXTRACT_TOOL_NAME: &str = "emit_result";

pub struct AnthropicConfig {
    pub api_key: String,
    pub base_url: String,
}

impl AnthropicConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            base_url: std::env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        }
    }
}

pub struct AnthropicProvider {
    config: AnthropicConfig,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::AnthropicOnManagedRuntime
    }

    async fn invoke_once(&self, request: InvokeRequest<'_>) -> Result<InvokeResponse> {
        let started = Instant::now();

        let (system, messages) = split_system(&request);
        let mut body = json!({
            "model": model_name(request.model_code),
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": messages,
        });
        if let Some(system) = system {
            body["system"] = json!(system);
        }
        if let Some(schema) = request.schema {
            body["tools"] = json!([{
                "name": EXTRACT_TOOL_NAME,
                "description": "Emit the final structured result.",
                "input_schema": to_json_schema(schema),
            }]);
            body["tool_choice"] = json!({ "type": "tool", "name": EXTRACT_TOOL_NAME });
        }

        let response = CLIENT
            .post(format!("{}/v1/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        let raw: Value = response.json().await.map_err(|e| {
            GatewayError::ProviderMalformedOutput(format!("non-JSON response body: {e}"))
        })?;

        if !status.is_success() {
            return Err(classify_status(status, &raw));
        }

        let content_blocks = raw
            .get("content")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let content = if request.schema.is_some() {
            extract_tool_input(&content_blocks)?
        } else {
            Value::String(extract_text(&content_blocks))
        };

        let finish_reason = raw
            .get("stop_reason")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        let (tokens_used, tokens_approximated) = match raw.get("usage") {
            Some(usage) => {
                let input = usage.get("input_tokens").and_then(Value::as_u64).unwrap_or(0);
                let output = usage.get("output_tokens").and_then(Value::as_u64).unwrap_or(0);
                ((input + output) as u32, false)
            }
            None => (gateway_core::llm::approximate_tokens(&content.to_string()), true),
        };

        Ok(InvokeResponse {
            content,
            finish_reason,
            tokens_used,
            tokens_approximated,
            processing_time_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// Strips the `<provider>:` prefix a `model_code` carries for resolver
/// dispatch (e.g. `anthropic:claude-3-5-sonnet-20241022`); the API itself
/// only ever sees the model name.
fn model_name(model_code: &str) -> &str {
    model_code.split_once(':').map(|(_, name)| name).unwrap_or(model_code)
}

fn split_system<'a>(request: &InvokeRequest<'a>) -> (Option<&'a str>, Vec<Value>) {
    let mut system = None;
    let mut messages = Vec::with_capacity(request.messages.len());
    for message in request.messages {
        match message.role {
            ChatRole::System => system = Some(message.content.as_str()),
            ChatRole::User => messages.push(json!({ "role": "user", "content": message.content })),
            ChatRole::Assistant => messages.push(json!({ "role": "assistant", "content": message.content })),
        }
    }
    (system, messages)
}

fn extract_text(blocks: &[Value]) -> String {
    blocks
        .iter()
        .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|b| b.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("\n")
}

fn extract_tool_input(blocks: &[Value]) -> Result<Value> {
    blocks
        .iter()
        .find(|b| b.get("type").and_then(Value::as_str) == Some("tool_use"))
        .and_then(|b| b.get("input").cloned())
        .ok_or_else(|| {
            GatewayError::ProviderMalformedOutput("no tool_use block in Anthropic response".to_string())
        })
}

fn classify_transport(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::ProviderTimeout
    } else {
        GatewayError::ProviderUnavailable(err.to_string())
    }
}

fn classify_status(status: StatusCode, body: &Value) -> GatewayError {
    let message = body
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("no error detail")
        .to_string();
    match status {
        StatusCode::TOO_MANY_REQUESTS => GatewayError::ProviderRateLimited,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => GatewayError::ProviderTimeout,
        s if s.is_client_error() => GatewayError::ProviderRefused(message),
        _ => GatewayError::ProviderUnavailable(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_name_strips_provider_prefix() {
        assert_eq!(model_name("anthropic:claude-3-5-sonnet-20241022"), "claude-3-5-sonnet-20241022");
    }

    #[test]
    fn model_name_passes_through_when_no_prefix() {
        assert_eq!(model_name("claude-3-5-sonnet-20241022"), "claude-3-5-sonnet-20241022");
    }

    #[test]
    fn classify_status_maps_429_to_rate_limited() {
        let err = classify_status(StatusCode::TOO_MANY_REQUESTS, &json!({}));
        assert_eq!(err.code(), "ProviderRateLimited");
    }

    #[test]
    fn classify_status_maps_other_4xx_to_refused() {
        let err = classify_status(StatusCode::BAD_REQUEST, &json!({"error": {"message": "bad schema"}}));
        assert_eq!(err.code(), "ProviderRefused");
    }

    #[test]
    fn extract_text_joins_text_blocks_in_order() {
        let blocks = vec![
            json!({"type": "text", "text": "first"}),
            json!({"type": "tool_use", "id": "x"}),
            json!({"type": "text", "text": "second"}),
        ];
        assert_eq!(extract_text(&blocks), "first\nsecond");
    }

    #[test]
    fn extract_tool_input_errors_without_tool_use_block() {
        let blocks = vec![json!({"type": "text", "text": "no structured output here"})];
        assert!(extract_tool_input(&blocks).is_err());
    }
}
