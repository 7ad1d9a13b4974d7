//! Maps a topic's `model_code` (spec §4.5: `"<provider>:<model>"`, e.g.
//! `anthropic:claude-3-5-sonnet-20241022`) to one of the three provider
//! crates, the same `provider_id:model_name` split the teacher's
//! `resolve_provider_and_model` uses in `service/src/main.rs`.

use gateway_core::error::{GatewayError, Result};
use gateway_core::llm::{LlmProvider, ProviderResolver};
use qmt_anthropic_provider::{AnthropicConfig, AnthropicProvider};
use qmt_local_provider::{LocalConfig, LocalProvider};
use qmt_openai_provider::{OpenAiConfig, OpenAiProvider};
use std::collections::HashMap;
use std::sync::Arc;

pub struct StaticProviderResolver {
    providers: HashMap<&'static str, Arc<dyn LlmProvider>>,
}

impl StaticProviderResolver {
    pub fn from_env() -> Self {
        let mut providers: HashMap<&'static str, Arc<dyn LlmProvider>> = HashMap::new();
        providers.insert("anthropic", Arc::new(AnthropicProvider::new(AnthropicConfig::from_env())));
        providers.insert("openai", Arc::new(OpenAiProvider::new(OpenAiConfig::from_env())));
        providers.insert("local", Arc::new(LocalProvider::new(LocalConfig::from_env())));
        Self { providers }
    }
}

impl ProviderResolver for StaticProviderResolver {
    fn resolve(&self, model_code: &str) -> Result<Arc<dyn LlmProvider>> {
        let provider_id = model_code
            .split_once(':')
            .map(|(id, _)| id)
            .unwrap_or(model_code);
        self.providers
            .get(provider_id)
            .cloned()
            .ok_or_else(|| GatewayError::ProviderUnavailable(format!("no provider registered for {model_code}")))
    }
}
