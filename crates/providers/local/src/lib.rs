//! LOCAL `LlmProvider` (spec §4.5): an OpenAI-compatible chat endpoint
//! reachable on the same network, for development and test runtimes that
//! don't carry a managed provider API key.

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
        .timeout(Duration::from_secs(120))
        .build()
        .expect("failed to build local http client")
});

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

pub struct LocalConfig {
    pub base_url: String,
}

impl LocalConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("LOCAL_LLM_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        }
    }
}

pub struct LocalProvider {
    config: LocalConfig,
}

impl LocalProvider {
    pub fn new(config: LocalConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl LlmProvider for LocalProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
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
            "stream": false,
        });
        if let Some(schema) = request.schema {
            body["format"] = to_json_schema(schema);
        }

        let response = CLIENT
            .post(format!("{}/v1/chat/completions", self.config.base_url))
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

        let text = raw
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|c| c.first())
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .unwrap_or_default();

        let content = if request.schema.is_some() {
            serde_json::from_str(text).map_err(|e| {
                GatewayError::ProviderMalformedOutput(format!("response content is not valid JSON: {e}"))
            })?
        } else {
            Value::String(text.to_string())
        };

        Ok(InvokeResponse {
            content,
            finish_reason: "stop".to_string(),
            tokens_used: gateway_core::llm::approximate_tokens(text),
            tokens_approximated: true,
            processing_time_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// Strips the `<provider>:` prefix a `model_code` carries for resolver
/// dispatch (e.g. `local:llama3`); the API itself only ever sees the model
/// name.
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
        assert_eq!(model_name("local:default-chat"), "default-chat");
    }

    #[test]
    fn model_name_passes_through_when_no_prefix() {
        assert_eq!(model_name("default-chat"), "default-chat");
    }

    #[test]
    fn classify_status_maps_429_to_rate_limited() {
        let err = classify_status(StatusCode::TOO_MANY_REQUESTS, &json!({}));
        assert_eq!(err.code(), "ProviderRateLimited");
    }

    #[test]
    fn classify_status_maps_other_4xx_to_refused() {
        let err = classify_status(StatusCode::BAD_REQUEST, &json!({"error": "bad request"}));
        assert_eq!(err.code(), "ProviderRefused");
    }
}
