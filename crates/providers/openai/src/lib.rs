//! OPENAI `LlmProvider` (spec §4.5): talks to the chat completions API and
//! requests structured output via `response_format: json_schema` when the
//! caller supplies a schema.

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
        .expect("failed to build openai http client")
});

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const SCHEMA_NAME: &str = "gateway_result";

pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
}

impl OpenAiConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            base_url: std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        }
    }
}

pub struct OpenAiProvider {
    config: OpenAiConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Openai
    }

    async fn invoke_once(&self, request: InvokeRequest<'_>) -> Result<InvokeResponse> {
        let started = Instant::now();

        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|m| {
                json!({
                    "role": match m.role {
                        ChatRole::System => "system",
                        ChatRole::User => "user",
                        ChatRole::Assistant => "assistant",
                    },
                    "content": m.content,
                })
            })
            .collect();

        let mut body = json!({
            "model": model_name(request.model_code),
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });
        if let Some(schema) = request.schema {
            body["response_format"] = json!({
                "type": "json_schema",
                "json_schema": {
                    "name": SCHEMA_NAME,
                    "strict": true,
                    "schema": to_json_schema(schema),
                },
            });
        }

        let response = CLIENT
            .post(format!("{}/v1/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
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

        let choice = raw
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|c| c.first())
            .ok_or_else(|| GatewayError::ProviderMalformedOutput("no choices in response".to_string()))?;

        let message = choice
            .get("message")
            .ok_or_else(|| GatewayError::ProviderMalformedOutput("choice has no message".to_string()))?;
        let text = message.get("content").and_then(Value::as_str).unwrap_or_default();

        let content = if request.schema.is_some() {
            serde_json::from_str(text).map_err(|e| {
                GatewayError::ProviderMalformedOutput(format!("response content is not valid JSON: {e}"))
            })?
        } else {
            Value::String(text.to_string())
        };

        let finish_reason = choice
            .get("finish_reason")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        let (tokens_used, tokens_approximated) = match raw.get("usage") {
            Some(usage) => (
                usage.get("total_tokens").and_then(Value::as_u64).unwrap_or(0) as u32,
                false,
            ),
            None => (gateway_core::llm::approximate_tokens(text), true),
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
/// dispatch (e.g. `openai:gpt-4o-mini`); the API itself only ever sees the
/// model name.
fn model_name(model_code: &str) -> &str {
    model_code.split_once(':').map(|(_, name)| name).unwrap_or(model_code)
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
        assert_eq!(model_name("openai:gpt-4o-mini"), "gpt-4o-mini");
    }

    #[test]
    fn model_name_passes_through_when_no_prefix() {
        assert_eq!(model_name("gpt-4o-mini"), "gpt-4o-mini");
    }

    #[test]
    fn classify_status_maps_5xx_to_unavailable() {
        let err = classify_status(StatusCode::SERVICE_UNAVAILABLE, &json!({}));
        assert_eq!(err.code(), "ProviderUnavailable");
    }

    #[test]
    fn classify_status_maps_timeout_status_to_provider_timeout() {
        let err = classify_status(StatusCode::GATEWAY_TIMEOUT, &json!({}));
        assert_eq!(err.code(), "ProviderTimeout");
    }
}
