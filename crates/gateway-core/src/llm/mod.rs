//! LLM Provider Abstraction (spec §4.5).
//!
//! `LlmProvider` is implemented once per backend crate
//! (`providers/anthropic`, `providers/openai`, `providers/local`), unified
//! the way the teacher workspace unifies `HTTPChatProvider` across its
//! provider crates. Retry/backoff policy lives here, not in each
//! provider, so it's applied uniformly (spec §4.5 invariants).

pub mod retry;

use crate::error::{GatewayError, Result};
use crate::schema::Schema;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderKind {
    AnthropicOnManagedRuntime,
    Openai,
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct InvokeRequest<'a> {
    pub model_code: &'a str,
    pub messages: &'a [ChatMessage],
    pub temperature: f32,
    pub max_tokens: u32,
    pub schema: Option<&'a Schema>,
}

#[derive(Debug, Clone)]
pub struct InvokeResponse {
    /// Parsed structured output when a schema was supplied, otherwise the
    /// free-text content wrapped as a JSON string.
    pub content: Value,
    pub finish_reason: String,
    pub tokens_used: u32,
    /// `true` when `tokens_used` was approximated as `len(text)/4` rather
    /// than read from the provider response (spec §4.5 "token accounting").
    pub tokens_approximated: bool,
    pub processing_time_ms: u64,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// A single invocation attempt. Retry policy (§4.5) wraps this at the
    /// `invoke_with_retry` call site; implementors do not retry internally.
    async fn invoke_once(&self, request: InvokeRequest<'_>) -> Result<InvokeResponse>;
}

/// Maps a topic's `model_code` to a concrete provider (spec §4.5: "each is
/// a distinct implementation selected by mapping `model_code` to a model
/// registry entry"). Shared by the synchronous executor, the job worker,
/// and the conversation engine.
pub trait ProviderResolver: Send + Sync {
    fn resolve(&self, model_code: &str) -> Result<std::sync::Arc<dyn LlmProvider>>;
}

/// Approximates token usage when a provider doesn't report it: `len(text)/4`,
/// flagged via `tokens_approximated` (spec §4.5).
pub fn approximate_tokens(text: &str) -> u32 {
    (text.len() as u32 / 4).max(1)
}

pub use retry::invoke_with_retry;
