//! Retry/backoff policy for LLM provider invocations (spec §4.5).
//!
//! `ProviderRateLimited` retries up to 3 times with exponential backoff
//! (1s, 2s, 4s, jittered ±25%). `ProviderTimeout` retries once. Every
//! other error is terminal.

use super::{InvokeRequest, InvokeResponse, LlmProvider};
use crate::error::{GatewayError, Result};
use rand::Rng;
use std::time::Duration;

const RATE_LIMIT_BACKOFFS_MS: [u64; 3] = [1000, 2000, 4000];

fn jittered(base_ms: u64) -> Duration {
    let jitter_fraction = rand::thread_rng().gen_range(-0.25..=0.25);
    let jittered_ms = (base_ms as f64 * (1.0 + jitter_fraction)).max(0.0);
    Duration::from_millis(jittered_ms as u64)
}

pub async fn invoke_with_retry(
    provider: &dyn LlmProvider,
    request: InvokeRequest<'_>,
) -> Result<InvokeResponse> {
    let mut rate_limit_attempts = 0usize;
    let mut timeout_attempts = 0usize;

    loop {
        match provider.invoke_once(request.clone()).await {
            Ok(response) => return Ok(response),
            Err(GatewayError::ProviderRateLimited) if rate_limit_attempts < RATE_LIMIT_BACKOFFS_MS.len() => {
                let delay = jittered(RATE_LIMIT_BACKOFFS_MS[rate_limit_attempts]);
                tracing::warn!(attempt = rate_limit_attempts + 1, delay_ms = delay.as_millis() as u64, "provider rate limited, retrying");
                rate_limit_attempts += 1;
                tokio::time::sleep(delay).await;
            }
            Err(GatewayError::ProviderTimeout) if timeout_attempts < 1 => {
                tracing::warn!("provider timed out, retrying once");
                timeout_attempts += 1;
            }
            Err(other) => return Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatMessage, ChatRole, ProviderKind};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FlakyProvider {
        fail_times: usize,
        calls: Arc<AtomicUsize>,
        error: fn() -> GatewayError,
    }

    #[async_trait]
    impl LlmProvider for FlakyProvider {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Local
        }

        async fn invoke_once(&self, _request: InvokeRequest<'_>) -> Result<InvokeResponse> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_times {
                return Err((self.error)());
            }
            Ok(InvokeResponse {
                content: serde_json::json!({"ok": true}),
                finish_reason: "stop".to_string(),
                tokens_used: 10,
                tokens_approximated: false,
                processing_time_ms: 1,
            })
        }
    }

    fn sample_request<'a>(messages: &'a [ChatMessage]) -> InvokeRequest<'a> {
        InvokeRequest {
            model_code: "test-model",
            messages,
            temperature: 0.5,
            max_tokens: 100,
            schema: None,
        }
    }

    #[tokio::test]
    async fn retries_rate_limit_up_to_three_times() {
        let messages = [ChatMessage { role: ChatRole::User, content: "hi".into() }];
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = FlakyProvider {
            fail_times: 3,
            calls: calls.clone(),
            error: || GatewayError::ProviderRateLimited,
        };
        let result = invoke_with_retry(&provider, sample_request(&messages)).await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn gives_up_after_four_rate_limit_failures() {
        let messages = [ChatMessage { role: ChatRole::User, content: "hi".into() }];
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = FlakyProvider {
            fail_times: 4,
            calls: calls.clone(),
            error: || GatewayError::ProviderRateLimited,
        };
        let result = invoke_with_retry(&provider, sample_request(&messages)).await;
        assert!(matches!(result, Err(GatewayError::ProviderRateLimited)));
    }

    #[tokio::test]
    async fn retries_timeout_exactly_once() {
        let messages = [ChatMessage { role: ChatRole::User, content: "hi".into() }];
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = FlakyProvider {
            fail_times: 1,
            calls: calls.clone(),
            error: || GatewayError::ProviderTimeout,
        };
        let result = invoke_with_retry(&provider, sample_request(&messages)).await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn does_not_retry_refused() {
        let messages = [ChatMessage { role: ChatRole::User, content: "hi".into() }];
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = FlakyProvider {
            fail_times: 100,
            calls: calls.clone(),
            error: || GatewayError::ProviderRefused("policy".into()),
        };
        let result = invoke_with_retry(&provider, sample_request(&messages)).await;
        assert!(matches!(result, Err(GatewayError::ProviderRefused(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
