//! Synchronous execution pipeline (spec §4.6 steps 2-5): enrichment,
//! template rendering, LLM dispatch, and schema validation for a
//! SINGLE_SHOT topic. Shared by the `/ai/execute` handler and the async
//! job worker, which runs the identical steps after its own CAS dequeue.

use crate::enrichment::{CallerContext, EnrichmentPipeline, EnrichmentSources};
use crate::error::{GatewayError, Result};
use crate::llm::{invoke_with_retry, ChatMessage, ChatRole, InvokeRequest, ProviderResolver};
use crate::prompt::PromptRenderer;
use crate::schema::ResponseModelRegistry;
use crate::topic::{PromptRole, TopicRegistry};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

pub struct Executor {
    pub registry: Arc<TopicRegistry>,
    pub schemas: Arc<ResponseModelRegistry>,
    pub prompts: Arc<PromptRenderer>,
    pub providers: Arc<dyn ProviderResolver>,
    pub sources: Arc<EnrichmentSources>,
}

#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub data: Value,
    pub schema_ref: String,
    pub model: String,
    pub tokens_used: u32,
    pub processing_time_ms: u64,
    pub finish_reason: String,
}

impl Executor {
    pub fn new(
        registry: Arc<TopicRegistry>,
        schemas: Arc<ResponseModelRegistry>,
        prompts: Arc<PromptRenderer>,
        providers: Arc<dyn ProviderResolver>,
        sources: Arc<EnrichmentSources>,
    ) -> Self {
        Self { registry, schemas, prompts, providers, sources }
    }

    pub async fn execute(
        &self,
        topic_id: &str,
        parameters: &HashMap<String, Value>,
        caller: &CallerContext,
    ) -> Result<ExecutionOutcome> {
        let started = Instant::now();

        let topic = self.registry.get(topic_id)?;
        self.registry.assert_single_shot(topic)?;
        let runtime_config = self.registry.merge_runtime_config(topic_id).await?;

        let context = EnrichmentPipeline::new(&self.sources)
            .run(topic, parameters, caller, None)
            .await?;

        let system_template = self.prompts.get_template(topic_id, PromptRole::System).await?;
        let user_template = self.prompts.get_template(topic_id, PromptRole::User).await?;
        let system_rendered = self.prompts.render(&system_template, &context)?;
        let user_rendered = self.prompts.render(&user_template, &context)?;

        let schema = self.schemas.get_schema(&topic.response_model_ref)?.clone();
        let provider = self.providers.resolve(&runtime_config.model_code)?;

        let messages = [
            ChatMessage { role: ChatRole::System, content: system_rendered },
            ChatMessage { role: ChatRole::User, content: user_rendered },
        ];
        let response = invoke_with_retry(
            provider.as_ref(),
            InvokeRequest {
                model_code: &runtime_config.model_code,
                messages: &messages,
                temperature: runtime_config.temperature,
                max_tokens: runtime_config.max_tokens,
                schema: Some(&schema),
            },
        )
        .await?;

        let validated = self
            .schemas
            .validate(&schema, &response.content)
            .map_err(GatewayError::from)?;

        Ok(ExecutionOutcome {
            data: validated,
            schema_ref: topic.response_model_ref.clone(),
            model: runtime_config.model_code.clone(),
            tokens_used: response.tokens_used,
            processing_time_ms: started.elapsed().as_millis() as u64,
            finish_reason: response.finish_reason,
        })
    }
}
