//! Conversation Session Engine (spec §4.8): the state machine plus the
//! per-session serialization and cross-user mutual exclusion invariants
//! from spec §5.

use super::store::{SessionStore, SessionStoreError};
use super::types::{ConversationSession, MessageRole, SessionId, SessionMessage, SessionStatus};
use crate::enrichment::{CallerContext, EnrichmentPipeline, EnrichmentSources};
use crate::error::{GatewayError, Result};
use crate::llm::{invoke_with_retry, ChatMessage, ChatRole, InvokeRequest, ProviderResolver};
use crate::prompt::PromptRenderer;
use crate::schema::ResponseModelRegistry;
use crate::topic::{PromptRole, TopicRegistry};
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex as AsyncMutex;

pub struct CheckResult {
    pub has_session: bool,
    pub session_id: Option<SessionId>,
    /// Presentation status (ACTIVE flips to "paused" past the idle timeout).
    pub status: Option<SessionStatus>,
    pub actual_status: Option<SessionStatus>,
    pub is_idle: bool,
    pub conflict: bool,
    pub conflict_user_id: Option<String>,
}

/// Per-session mutex registry serializing `message` calls for the same
/// `session_id` (spec §5): either a held mutex or a single-writer queue
/// per session is acceptable; this uses the mutex form.
#[derive(Default)]
struct SessionLocks {
    locks: StdMutex<HashMap<SessionId, Arc<AsyncMutex<()>>>>,
}

impl SessionLocks {
    fn lock_for(&self, session_id: SessionId) -> Arc<AsyncMutex<()>> {
        self.locks
            .lock()
            .unwrap()
            .entry(session_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

pub struct SessionEngine {
    store: Arc<dyn SessionStore>,
    registry: Arc<TopicRegistry>,
    schemas: Arc<ResponseModelRegistry>,
    prompts: Arc<PromptRenderer>,
    providers: Arc<dyn ProviderResolver>,
    sources: Arc<EnrichmentSources>,
    locks: SessionLocks,
}

impl SessionEngine {
    pub fn new(
        store: Arc<dyn SessionStore>,
        registry: Arc<TopicRegistry>,
        schemas: Arc<ResponseModelRegistry>,
        prompts: Arc<PromptRenderer>,
        providers: Arc<dyn ProviderResolver>,
        sources: Arc<EnrichmentSources>,
    ) -> Self {
        Self {
            store,
            registry,
            schemas,
            prompts,
            providers,
            sources,
            locks: SessionLocks::default(),
        }
    }

    pub async fn check(&self, caller: &CallerContext, topic_id: &str) -> Result<CheckResult> {
        let runtime_config = self.registry.merge_runtime_config(topic_id).await?;
        let candidates = self
            .store
            .find_non_terminal_by_tenant_topic(&caller.tenant_id, topic_id)
            .await
            .map_err(store_err)?;

        let mine = candidates.iter().find(|s| s.user_id == caller.user_id);
        let other = candidates.iter().find(|s| s.user_id != caller.user_id);

        let now = Utc::now();
        let idle_timeout = chrono::Duration::from_std(runtime_config.idle_timeout_or_default())
            .unwrap_or_else(|_| chrono::Duration::minutes(30));

        if let Some(session) = mine {
            Ok(CheckResult {
                has_session: true,
                session_id: Some(session.session_id),
                status: Some(session.computed_status(now, idle_timeout)),
                actual_status: Some(session.status),
                is_idle: session.is_idle(now, idle_timeout),
                conflict: other.is_some(),
                conflict_user_id: other.map(|s| s.user_id.clone()),
            })
        } else {
            Ok(CheckResult {
                has_session: false,
                session_id: None,
                status: None,
                actual_status: None,
                is_idle: false,
                conflict: other.is_some(),
                conflict_user_id: other.map(|s| s.user_id.clone()),
            })
        }
    }

    pub async fn start(
        &self,
        caller: &CallerContext,
        topic_id: &str,
        context: Value,
    ) -> Result<ConversationSession> {
        let topic = self.registry.get(topic_id)?;
        self.registry.assert_conversation(topic)?;
        let runtime_config = self.registry.merge_runtime_config(topic_id).await?;

        let non_terminal = self
            .store
            .find_non_terminal_by_tenant_topic(&caller.tenant_id, topic_id)
            .await
            .map_err(store_err)?;

        if let Some(other) = non_terminal.iter().find(|s| s.user_id != caller.user_id) {
            return Err(GatewayError::SessionConflict {
                conflict_user_id: other.user_id.clone(),
            });
        }

        // Cancel the caller's own prior session atomically before creating
        // the new one (spec §4.8 "start"): one logical transaction.
        if let Some(existing) = non_terminal.into_iter().find(|s| s.user_id == caller.user_id) {
            let mut cancelled = existing.clone();
            cancelled.status = SessionStatus::Cancelled;
            cancelled.updated_at = Utc::now();
            self.store
                .compare_and_update(cancelled, existing.status)
                .await
                .map_err(store_err)?;
        }

        let rendered_context = EnrichmentPipeline::new(&self.sources)
            .run(topic, &HashMap::new(), caller, None)
            .await?;
        let mut merged_context = context;
        if let Value::Object(ref mut map) = merged_context {
            map.insert(
                "parameters".to_string(),
                serde_json::to_value(&rendered_context)?,
            );
        }

        let max_turns = runtime_config.max_turns.unwrap_or(1);
        let mut session = ConversationSession::new(
            caller.tenant_id.clone(),
            caller.user_id.clone(),
            topic_id.to_string(),
            max_turns,
            merged_context,
            Utc::now(),
        );

        let provider = self.providers.resolve(&runtime_config.model_code)?;
        let template = self.prompts.get_template(topic_id, PromptRole::Initiation).await?;
        let rendered = self.prompts.render(&template, &rendered_context)?;
        let opening = invoke_with_retry(
            provider.as_ref(),
            InvokeRequest {
                model_code: &runtime_config.model_code,
                messages: &[ChatMessage { role: ChatRole::User, content: rendered }],
                temperature: runtime_config.temperature,
                max_tokens: runtime_config.max_tokens,
                schema: None,
            },
        )
        .await?;

        session.messages.push(SessionMessage {
            role: MessageRole::Assistant,
            content: text_of(&opening.content),
            timestamp: Utc::now(),
            tokens: Some(opening.tokens_used),
        });
        session.turn = 1;

        self.store.create(session.clone()).await.map_err(store_err)?;
        Ok(session)
    }

    pub async fn resume(&self, caller: &CallerContext, session_id: SessionId) -> Result<ConversationSession> {
        let lock = self.locks.lock_for(session_id);
        let _guard = lock.lock().await;

        let mut session = self.load_owned(caller, session_id).await?;
        if session.status.is_terminal() {
            return Err(GatewayError::SessionNotActive);
        }
        if session.is_expired(Utc::now()) {
            return Err(GatewayError::SessionExpired);
        }

        self.registry.assert_conversation(self.registry.get(&session.topic_id)?)?;
        let runtime_config = self.registry.merge_runtime_config(&session.topic_id).await?;
        let provider = self.providers.resolve(&runtime_config.model_code)?;

        let summary = conversation_summary(&session);
        let mut ctx = HashMap::new();
        ctx.insert("summary".to_string(), Value::String(summary));
        let template = self.prompts.get_template(&session.topic_id, PromptRole::Resume).await?;
        let rendered = self.prompts.render(&template, &ctx)?;

        let welcome = invoke_with_retry(
            provider.as_ref(),
            InvokeRequest {
                model_code: &runtime_config.model_code,
                messages: &[ChatMessage { role: ChatRole::User, content: rendered }],
                temperature: runtime_config.temperature,
                max_tokens: runtime_config.max_tokens,
                schema: None,
            },
        )
        .await?;

        let previous_status = session.status;
        session.messages.push(SessionMessage {
            role: MessageRole::Assistant,
            content: text_of(&welcome.content),
            timestamp: Utc::now(),
            tokens: Some(welcome.tokens_used),
        });
        session.status = SessionStatus::Active;
        session.last_activity_at = Utc::now();
        session.updated_at = Utc::now();

        self.store
            .compare_and_update(session.clone(), previous_status)
            .await
            .map_err(store_err)?;
        Ok(session)
    }

    pub async fn message(
        &self,
        caller: &CallerContext,
        session_id: SessionId,
        user_message: String,
    ) -> Result<ConversationSession> {
        let lock = self.locks.lock_for(session_id);
        let _guard = lock.lock().await;

        let mut session = self.load_owned(caller, session_id).await?;
        // Idle (computed "paused") sessions still accept messages; only
        // explicit PAUSED is rejected (spec §4.8 "message").
        if session.status != SessionStatus::Active {
            return Err(GatewayError::SessionNotActive);
        }
        if session.is_expired(Utc::now()) {
            return Err(GatewayError::SessionExpired);
        }

        let previous_status = session.status;
        let runtime_config = self.registry.merge_runtime_config(&session.topic_id).await?;
        let schema_ref = self.registry.get(&session.topic_id)?.response_model_ref.clone();
        let schema = self.schemas.get_schema(&schema_ref)?.clone();
        let provider = self.providers.resolve(&runtime_config.model_code)?;

        session.messages.push(SessionMessage {
            role: MessageRole::User,
            content: user_message,
            timestamp: Utc::now(),
            tokens: None,
        });

        let system_template = self.prompts.get_template(&session.topic_id, PromptRole::System).await?;
        let system_prompt = self.prompts.render(&system_template, &HashMap::new())?;
        let chat_messages = to_chat_messages(&system_prompt, &session.messages);
        let response = invoke_with_retry(
            provider.as_ref(),
            InvokeRequest {
                model_code: &runtime_config.model_code,
                messages: &chat_messages,
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

        session.messages.push(SessionMessage {
            role: MessageRole::Assistant,
            content: summary_or_text(&validated),
            timestamp: Utc::now(),
            tokens: Some(response.tokens_used),
        });
        session.turn += 1;
        session.last_activity_at = Utc::now();
        session.updated_at = Utc::now();

        let is_final = validated.get("is_final").and_then(Value::as_bool).unwrap_or(false);
        if is_final || session.turn >= session.max_turns {
            session.status = SessionStatus::Completed;
            session.result = Some(validated);
        }

        self.store
            .compare_and_update(session.clone(), previous_status)
            .await
            .map_err(store_err)?;
        Ok(session)
    }

    pub async fn pause(&self, caller: &CallerContext, session_id: SessionId) -> Result<ConversationSession> {
        let lock = self.locks.lock_for(session_id);
        let _guard = lock.lock().await;

        let mut session = self.load_owned(caller, session_id).await?;
        if session.status == SessionStatus::Paused {
            return Ok(session); // idempotent
        }
        if session.status != SessionStatus::Active {
            return Err(GatewayError::SessionNotActive);
        }
        let previous_status = session.status;
        session.status = SessionStatus::Paused;
        session.updated_at = Utc::now();
        self.store
            .compare_and_update(session.clone(), previous_status)
            .await
            .map_err(store_err)?;
        Ok(session)
    }

    pub async fn cancel(&self, caller: &CallerContext, session_id: SessionId) -> Result<ConversationSession> {
        let lock = self.locks.lock_for(session_id);
        let _guard = lock.lock().await;

        let mut session = self.load_owned(caller, session_id).await?;
        if session.status.is_terminal() {
            return Err(GatewayError::SessionNotActive);
        }
        let previous_status = session.status;
        session.status = SessionStatus::Cancelled;
        session.updated_at = Utc::now();
        self.store
            .compare_and_update(session.clone(), previous_status)
            .await
            .map_err(store_err)?;
        Ok(session)
    }

    pub async fn complete(&self, caller: &CallerContext, session_id: SessionId) -> Result<ConversationSession> {
        let lock = self.locks.lock_for(session_id);
        let _guard = lock.lock().await;

        let mut session = self.load_owned(caller, session_id).await?;
        if session.status.is_terminal() {
            return Err(GatewayError::SessionNotActive);
        }

        let previous_status = session.status;
        let runtime_config = self.registry.merge_runtime_config(&session.topic_id).await?;
        let schema_ref = self.registry.get(&session.topic_id)?.response_model_ref.clone();
        let schema = self.schemas.get_schema(&schema_ref)?.clone();
        let provider = self.providers.resolve(&runtime_config.model_code)?;
        let system_template = self.prompts.get_template(&session.topic_id, PromptRole::System).await?;
        let system_prompt = self.prompts.render(&system_template, &HashMap::new())?;
        let chat_messages = to_chat_messages(&system_prompt, &session.messages);

        let mut attempts = 0;
        let validated = loop {
            let response = invoke_with_retry(
                provider.as_ref(),
                InvokeRequest {
                    model_code: &runtime_config.model_code,
                    messages: &chat_messages,
                    temperature: runtime_config.temperature,
                    max_tokens: runtime_config.max_tokens,
                    schema: Some(&schema),
                },
            )
            .await?;

            match self.schemas.validate(&schema, &response.content) {
                Ok(v) => break v,
                Err(e) if attempts == 0 => {
                    attempts += 1;
                    tracing::warn!(session_id = %session_id, error = ?e, "extraction failed, retrying once");
                    continue;
                }
                Err(e) => {
                    session.status = SessionStatus::Failed;
                    session.updated_at = Utc::now();
                    self.store
                        .compare_and_update(session.clone(), previous_status)
                        .await
                        .map_err(store_err)?;
                    return Err(GatewayError::ExtractionFailed(format!("{e:?}")));
                }
            }
        };

        session.status = SessionStatus::Completed;
        session.result = Some(validated);
        session.updated_at = Utc::now();
        self.store
            .compare_and_update(session.clone(), previous_status)
            .await
            .map_err(store_err)?;
        Ok(session)
    }

    pub async fn get(&self, caller: &CallerContext, session_id: SessionId) -> Result<ConversationSession> {
        self.load_owned(caller, session_id).await
    }

    pub async fn list(
        &self,
        caller: &CallerContext,
        include_completed: bool,
        limit: usize,
    ) -> Result<Vec<ConversationSession>> {
        self.store
            .list_by_user(&caller.tenant_id, &caller.user_id, include_completed, limit)
            .await
            .map_err(store_err)
    }

    /// Background sweep (spec §4.8, §5): transitions expired non-terminal
    /// sessions to ABANDONED. Idempotent; never overrides terminal states.
    pub async fn sweep_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let expirable = self.store.find_expirable(now).await.map_err(store_err)?;
        let mut swept = 0;
        for session_id in expirable {
            let lock = self.locks.lock_for(session_id);
            let _guard = lock.lock().await;
            if let Some(mut session) = self.store.get(&session_id).await.map_err(store_err)? {
                if session.status.is_terminal() || !session.is_expired(now) {
                    continue;
                }
                let previous_status = session.status;
                session.status = SessionStatus::Abandoned;
                session.updated_at = now;
                if self
                    .store
                    .compare_and_update(session, previous_status)
                    .await
                    .is_ok()
                {
                    swept += 1;
                }
            }
        }
        Ok(swept)
    }

    async fn load_owned(&self, caller: &CallerContext, session_id: SessionId) -> Result<ConversationSession> {
        let session = self
            .store
            .get(&session_id)
            .await
            .map_err(store_err)?
            .ok_or_else(|| GatewayError::SessionNotFound(session_id.to_string()))?;
        if session.tenant_id != caller.tenant_id || session.user_id != caller.user_id {
            return Err(GatewayError::SessionAccessDenied);
        }
        Ok(session)
    }
}

fn store_err(e: SessionStoreError) -> GatewayError {
    match e {
        SessionStoreError::NotFound(id) => GatewayError::SessionNotFound(id.to_string()),
        SessionStoreError::Conflict(msg) => GatewayError::Internal(format!("session store conflict: {msg}")),
        SessionStoreError::Other(msg) => GatewayError::Internal(msg),
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn summary_or_text(value: &Value) -> String {
    value
        .get("summary")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| text_of(value))
}

fn conversation_summary(session: &ConversationSession) -> String {
    session
        .messages
        .iter()
        .map(|m| format!("{:?}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prepends the rendered ongoing-turn SYSTEM template (spec §4.8 "message":
/// "renders the ongoing template") ahead of the accumulated conversation.
fn to_chat_messages(system_prompt: &str, messages: &[SessionMessage]) -> Vec<ChatMessage> {
    std::iter::once(ChatMessage { role: ChatRole::System, content: system_prompt.to_string() })
        .chain(messages.iter().map(|m| ChatMessage {
            role: match m.role {
                MessageRole::User => ChatRole::User,
                MessageRole::Assistant => ChatRole::Assistant,
                MessageRole::System => ChatRole::System,
            },
            content: m.content.clone(),
        }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::llm::{InvokeResponse, LlmProvider, ProviderKind};
    use crate::schema::Schema;
    use crate::session::in_memory::InMemorySessionStore;
    use crate::topic::{ParameterDef, RuntimeConfig, Topic, TopicCategory, TopicType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoProvider {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl LlmProvider for EchoProvider {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Local
        }

        async fn invoke_once(&self, _request: InvokeRequest<'_>) -> Result<InvokeResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(InvokeResponse {
                content: serde_json::json!({"summary": "ok", "is_final": false}),
                finish_reason: "stop".to_string(),
                tokens_used: 3,
                tokens_approximated: false,
                processing_time_ms: 1,
            })
        }
    }

    struct SingleProviderResolver(Arc<dyn LlmProvider>);

    impl ProviderResolver for SingleProviderResolver {
        fn resolve(&self, _model_code: &str) -> Result<Arc<dyn LlmProvider>> {
            Ok(self.0.clone())
        }
    }

    struct FixedTemplateStore;

    #[async_trait]
    impl crate::prompt::TemplateStore for FixedTemplateStore {
        async fn get_active_template(
            &self,
            _topic_id: &str,
            _role: PromptRole,
        ) -> std::result::Result<Option<String>, String> {
            Ok(Some("fixed template with no placeholders".to_string()))
        }
    }

    fn purpose_topic(max_turns: u32) -> Topic {
        Topic {
            topic_id: "purpose".to_string(),
            topic_type: TopicType::ConversationCoaching,
            category: TopicCategory::Coaching,
            description: "test conversation topic".to_string(),
            response_model_ref: "purpose_result".to_string(),
            parameter_refs: Vec::<ParameterDef>::new(),
            is_active: true,
            runtime_config: RuntimeConfig {
                model_code: "local:echo".to_string(),
                temperature: 0.5,
                max_tokens: 128,
                timeout: None,
                idle_timeout: None,
                max_turns: Some(max_turns),
            },
        }
    }

    fn purpose_schemas() -> ResponseModelRegistry {
        let mut schemas = ResponseModelRegistry::new();
        schemas.register(
            "purpose_result",
            Schema::Object {
                fields: vec![
                    ("summary".to_string(), Schema::String { min_len: None, max_len: None }, false),
                    ("is_final".to_string(), Schema::Boolean, true),
                ],
            },
        );
        schemas
    }

    fn build_engine_with_store(max_turns: u32, store: Arc<dyn SessionStore>) -> SessionEngine {
        let topic = purpose_topic(max_turns);
        let registry = Arc::new(TopicRegistry::new(vec![topic], Arc::new(crate::topic::NoopRuntimeConfigStore)).unwrap());
        let provider: Arc<dyn LlmProvider> = Arc::new(EchoProvider { calls: Arc::new(AtomicUsize::new(0)) });
        let providers: Arc<dyn ProviderResolver> = Arc::new(SingleProviderResolver(provider));
        let prompts = Arc::new(PromptRenderer::new(Box::new(FixedTemplateStore)));
        let sources = Arc::new(EnrichmentSources::new());
        SessionEngine::new(store, registry, Arc::new(purpose_schemas()), prompts, providers, sources)
    }

    fn build_engine(max_turns: u32) -> SessionEngine {
        build_engine_with_store(max_turns, Arc::new(InMemorySessionStore::new()))
    }

    fn caller() -> CallerContext {
        CallerContext { tenant_id: "tenant-a".to_string(), user_id: "user-1".to_string() }
    }

    #[tokio::test]
    async fn start_rejects_second_user_on_same_tenant_topic() {
        let engine = build_engine(3);
        engine.start(&caller(), "purpose", Value::Null).await.unwrap();

        let other = CallerContext { tenant_id: "tenant-a".to_string(), user_id: "user-2".to_string() };
        let err = engine.start(&other, "purpose", Value::Null).await.unwrap_err();
        match err {
            GatewayError::SessionConflict { conflict_user_id } => assert_eq!(conflict_user_id, "user-1"),
            other => panic!("expected SessionConflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn pause_is_idempotent_under_repeated_calls() {
        let engine = build_engine(3);
        let session = engine.start(&caller(), "purpose", Value::Null).await.unwrap();

        let first = engine.pause(&caller(), session.session_id).await.unwrap();
        assert_eq!(first.status, SessionStatus::Paused);

        // Repeating pause on an already-paused session is a no-op, not an error.
        let second = engine.pause(&caller(), session.session_id).await.unwrap();
        assert_eq!(second.status, SessionStatus::Paused);
    }

    #[tokio::test]
    async fn message_auto_completes_session_at_max_turns() {
        let engine = build_engine(2);
        let session = engine.start(&caller(), "purpose", Value::Null).await.unwrap();
        assert_eq!(session.turn, 1);
        assert_eq!(session.status, SessionStatus::Active);

        let after = engine.message(&caller(), session.session_id, "hello".to_string()).await.unwrap();
        assert_eq!(after.turn, 2);
        assert_eq!(after.status, SessionStatus::Completed);
        assert!(after.result.is_some());
    }

    #[tokio::test]
    async fn message_accepts_turns_on_an_idle_but_still_active_session() {
        let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let engine = build_engine_with_store(5, store.clone());
        let mut session = engine.start(&caller(), "purpose", Value::Null).await.unwrap();

        // Simulate an idle session: `last_activity_at` far in the past, but
        // the stored `status` is still ACTIVE (spec §3.4 presentation-only
        // "paused" derivation) — `message` must still accept it.
        session.last_activity_at = Utc::now() - chrono::Duration::hours(2);
        store.compare_and_update(session.clone(), SessionStatus::Active).await.unwrap();

        let result = engine.message(&caller(), session.session_id, "still here".to_string()).await;
        assert!(result.is_ok(), "idle-but-active session should still accept messages: {result:?}");

        // A session explicitly PAUSED, on the other hand, must be rejected.
        let paused = engine.pause(&caller(), session.session_id).await.unwrap();
        assert_eq!(paused.status, SessionStatus::Paused);
        let rejected = engine.message(&caller(), session.session_id, "nope".to_string()).await;
        assert!(matches!(rejected, Err(GatewayError::SessionNotActive)));
    }
}
