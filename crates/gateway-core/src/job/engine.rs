//! Async job worker (spec §4.7): dequeues dispatch messages, performs the
//! `PENDING -> PROCESSING` compare-and-set, runs the shared synchronous
//! execution pipeline, and publishes a terminal event.

use super::events::{EventPublisher, JobEvent, JobEventData, JobEventType, Stage};
use super::queue::InMemoryJobQueue;
use super::store::{JobStore, JobStoreError};
use super::types::{AsyncJob, JobId, JobStatus, MAX_ATTEMPTS};
use crate::enrichment::CallerContext;
use crate::error::{GatewayError, Result};
use crate::executor::Executor;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub struct JobWorker {
    store: Arc<dyn JobStore>,
    queue: Arc<InMemoryJobQueue>,
    executor: Arc<Executor>,
    events: Arc<dyn EventPublisher>,
    stage: Stage,
}

impl JobWorker {
    pub fn new(
        store: Arc<dyn JobStore>,
        queue: Arc<InMemoryJobQueue>,
        executor: Arc<Executor>,
        events: Arc<dyn EventPublisher>,
        stage: Stage,
    ) -> Self {
        Self { store, queue, executor, events, stage }
    }

    pub async fn enqueue(
        &self,
        caller: &CallerContext,
        topic_id: &str,
        parameters: Value,
    ) -> Result<AsyncJob> {
        let topic = self.executor.registry.get(topic_id)?;
        self.executor.registry.assert_single_shot(topic)?;

        let job = AsyncJob::new(
            caller.tenant_id.clone(),
            caller.user_id.clone(),
            topic_id.to_string(),
            parameters,
            Utc::now(),
        );
        self.store.create(job.clone()).await.map_err(job_store_err)?;
        self.queue.enqueue(job.job_id, caller.tenant_id.clone()).await;
        Ok(job)
    }

    pub async fn get(&self, caller: &CallerContext, job_id: JobId) -> Result<AsyncJob> {
        let job = self
            .store
            .get(&job_id)
            .await
            .map_err(job_store_err)?
            .ok_or_else(|| GatewayError::JobNotFound(job_id.to_string()))?;
        if job.tenant_id != caller.tenant_id || job.user_id != caller.user_id {
            return Err(GatewayError::JobAccessDenied);
        }
        Ok(job)
    }

    pub async fn list(&self, caller: &CallerContext, limit: usize) -> Result<Vec<AsyncJob>> {
        self.store.list_by_tenant(&caller.tenant_id, limit).await.map_err(job_store_err)
    }

    /// Drains the queue forever. Spawn with `tokio::spawn`.
    pub async fn run(self: Arc<Self>) {
        loop {
            let (job_id, tenant_id) = self.queue.dequeue().await;
            if let Err(cause) = self.process_one(job_id).await {
                tracing::warn!(job_id = %job_id, error = ?cause, "job processing failed");
            }
            self.queue.release(&tenant_id).await;
        }
    }

    async fn process_one(&self, job_id: JobId) -> Result<()> {
        let job = match self.store.get(&job_id).await.map_err(job_store_err)? {
            Some(j) => j,
            None => return Ok(()),
        };
        // Idempotent delivery: a terminal job or one already claimed by
        // another worker is a no-op (spec "Duplicate async-job dispatch
        // messages ... result in at most one PROCESSING transition").
        if job.status.is_terminal() {
            return Ok(());
        }

        let mut processing = job.clone();
        processing.status = JobStatus::Processing;
        processing.started_at = Some(Utc::now());
        processing.attempts += 1;

        if self
            .store
            .compare_and_update(processing.clone(), job.status)
            .await
            .is_err()
        {
            return Ok(());
        }

        if processing.attempts > MAX_ATTEMPTS {
            self.fail(processing, "RETRIES_EXHAUSTED", "job retries exhausted").await?;
            return Ok(());
        }

        let caller = CallerContext {
            tenant_id: processing.tenant_id.clone(),
            user_id: processing.user_id.clone(),
        };
        let parameters: HashMap<String, Value> = match processing.parameters.as_object() {
            Some(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            None => HashMap::new(),
        };

        match self.executor.execute(&processing.topic_id, &parameters, &caller).await {
            Ok(outcome) => {
                let mut completed = processing;
                completed.status = JobStatus::Completed;
                completed.result = Some(serde_json::json!({
                    "data": outcome.data,
                    "schema_ref": outcome.schema_ref,
                    "metadata": {
                        "model": outcome.model,
                        "tokens_used": outcome.tokens_used,
                        "processing_time_ms": outcome.processing_time_ms,
                        "finish_reason": outcome.finish_reason,
                    },
                }));
                completed.completed_at = Some(Utc::now());
                completed.processing_time_ms = Some(outcome.processing_time_ms);
                self.finish(completed.clone(), JobStatus::Processing).await?;
                self.publish_completed(&completed, outcome.processing_time_ms).await;
                Ok(())
            }
            Err(cause) => {
                self.fail(processing, cause.code(), &cause.to_string()).await
            }
        }
    }

    async fn fail(&self, mut job: AsyncJob, error_code: &str, error: &str) -> Result<()> {
        let processing_time_ms = job
            .started_at
            .map(|started| (Utc::now() - started).num_milliseconds().max(0) as u64)
            .unwrap_or(0);
        job.status = JobStatus::Failed;
        job.error = Some(error.to_string());
        job.error_code = Some(error_code.to_string());
        job.completed_at = Some(Utc::now());
        job.processing_time_ms = Some(processing_time_ms);
        self.finish(job.clone(), JobStatus::Processing).await?;
        self.publish_failed(&job, processing_time_ms).await;
        Ok(())
    }

    async fn finish(&self, job: AsyncJob, expected: JobStatus) -> Result<()> {
        self.store.compare_and_update(job, expected).await.map_err(job_store_err)
    }

    async fn publish_completed(&self, job: &AsyncJob, processing_time_ms: u64) {
        let event = JobEvent {
            event_type: JobEventType::Completed,
            job_id: job.job_id,
            tenant_id: job.tenant_id.clone(),
            user_id: job.user_id.clone(),
            topic_id: job.topic_id.clone(),
            data: JobEventData {
                job_id: job.job_id,
                topic_id: job.topic_id.clone(),
                result: job.result.clone(),
                error: None,
                error_code: None,
                processing_time_ms,
            },
            stage: self.stage,
        };
        if let Err(cause) = self.events.publish(event).await {
            tracing::warn!(job_id = %job.job_id, error = %cause, "failed to publish ai.job.completed");
        }
    }

    async fn publish_failed(&self, job: &AsyncJob, processing_time_ms: u64) {
        let event = JobEvent {
            event_type: JobEventType::Failed,
            job_id: job.job_id,
            tenant_id: job.tenant_id.clone(),
            user_id: job.user_id.clone(),
            topic_id: job.topic_id.clone(),
            data: JobEventData {
                job_id: job.job_id,
                topic_id: job.topic_id.clone(),
                result: None,
                error: job.error.clone(),
                error_code: job.error_code.clone(),
                processing_time_ms,
            },
            stage: self.stage,
        };
        if let Err(cause) = self.events.publish(event).await {
            tracing::warn!(job_id = %job.job_id, error = %cause, "failed to publish ai.job.failed");
        }
    }

    /// Background sweep (spec §5): jobs stuck in PROCESSING past the
    /// per-job cap transition directly to FAILED, no retry.
    pub async fn sweep_processing_timeouts(&self) -> Result<usize> {
        let now = Utc::now();
        let stuck = self.store.find_stuck_processing(now).await.map_err(job_store_err)?;
        let mut swept = 0;
        for job_id in stuck {
            if let Some(job) = self.store.get(&job_id).await.map_err(job_store_err)? {
                if job.status != JobStatus::Processing {
                    continue;
                }
                if self.fail(job, "PROCESSING_TIMEOUT", "processing exceeded the timeout cap").await.is_ok() {
                    swept += 1;
                }
            }
        }
        Ok(swept)
    }
}

fn job_store_err(e: JobStoreError) -> GatewayError {
    match e {
        JobStoreError::NotFound(id) => GatewayError::JobNotFound(id.to_string()),
        JobStoreError::Conflict(msg) => GatewayError::Internal(format!("job store conflict: {msg}")),
        JobStoreError::Other(msg) => GatewayError::Internal(msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::job::in_memory::InMemoryJobStore;
    use crate::llm::{InvokeResponse, LlmProvider, ProviderKind};
    use crate::prompt::{PromptRenderer, TemplateStore};
    use crate::schema::{ResponseModelRegistry, Schema};
    use crate::topic::{NoopRuntimeConfigStore, ParameterDef, PromptRole, RuntimeConfig, Topic, TopicCategory, TopicType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl LlmProvider for CountingProvider {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Local
        }

        async fn invoke_once(&self, _request: crate::llm::InvokeRequest<'_>) -> Result<InvokeResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(InvokeResponse {
                content: serde_json::json!({"summary": "ok"}),
                finish_reason: "stop".to_string(),
                tokens_used: 2,
                tokens_approximated: false,
                processing_time_ms: 1,
            })
        }
    }

    struct SingleProviderResolver(Arc<dyn LlmProvider>);

    impl crate::llm::ProviderResolver for SingleProviderResolver {
        fn resolve(&self, _model_code: &str) -> Result<Arc<dyn LlmProvider>> {
            Ok(self.0.clone())
        }
    }

    struct FixedTemplateStore;

    #[async_trait]
    impl TemplateStore for FixedTemplateStore {
        async fn get_active_template(
            &self,
            _topic_id: &str,
            _role: PromptRole,
        ) -> std::result::Result<Option<String>, String> {
            Ok(Some("fixed template with no placeholders".to_string()))
        }
    }

    /// Wraps a real store but always reports a CAS conflict, to exercise the
    /// "swallow the conflict as a no-op" branch in `process_one` without
    /// needing a genuinely concurrent second worker.
    struct ConflictingStore(InMemoryJobStore);

    #[async_trait]
    impl JobStore for ConflictingStore {
        async fn create(&self, job: AsyncJob) -> std::result::Result<(), JobStoreError> {
            self.0.create(job).await
        }
        async fn get(&self, job_id: &JobId) -> std::result::Result<Option<AsyncJob>, JobStoreError> {
            self.0.get(job_id).await
        }
        async fn compare_and_update(
            &self,
            _job: AsyncJob,
            _expected_status: JobStatus,
        ) -> std::result::Result<(), JobStoreError> {
            Err(JobStoreError::Conflict("claimed by another worker".to_string()))
        }
        async fn list_by_tenant(&self, tenant_id: &str, limit: usize) -> std::result::Result<Vec<AsyncJob>, JobStoreError> {
            self.0.list_by_tenant(tenant_id, limit).await
        }
        async fn find_stuck_processing(&self, now: chrono::DateTime<Utc>) -> std::result::Result<Vec<JobId>, JobStoreError> {
            self.0.find_stuck_processing(now).await
        }
    }

    fn single_shot_topic() -> Topic {
        Topic {
            topic_id: "niche_review".to_string(),
            topic_type: TopicType::SingleShot,
            category: TopicCategory::Analysis,
            description: "test single-shot topic".to_string(),
            response_model_ref: "niche_review_result".to_string(),
            parameter_refs: Vec::<ParameterDef>::new(),
            is_active: true,
            runtime_config: RuntimeConfig {
                model_code: "local:echo".to_string(),
                temperature: 0.2,
                max_tokens: 64,
                timeout: None,
                idle_timeout: None,
                max_turns: None,
            },
        }
    }

    fn build_worker(store: Arc<dyn JobStore>, calls: Arc<AtomicUsize>) -> JobWorker {
        let registry = Arc::new(
            crate::topic::TopicRegistry::new(vec![single_shot_topic()], Arc::new(NoopRuntimeConfigStore)).unwrap(),
        );
        let mut schemas = ResponseModelRegistry::new();
        schemas.register(
            "niche_review_result",
            Schema::Object {
                fields: vec![("summary".to_string(), Schema::String { min_len: None, max_len: None }, false)],
            },
        );
        let provider: Arc<dyn LlmProvider> = Arc::new(CountingProvider { calls });
        let providers: Arc<dyn crate::llm::ProviderResolver> = Arc::new(SingleProviderResolver(provider));
        let prompts = Arc::new(PromptRenderer::new(Box::new(FixedTemplateStore)));
        let sources = Arc::new(crate::enrichment::EnrichmentSources::new());
        let executor = Arc::new(Executor::new(registry, Arc::new(schemas), prompts, providers, sources));
        JobWorker::new(
            store,
            InMemoryJobQueue::new(10),
            executor,
            Arc::new(crate::job::events::LoggingEventPublisher),
            Stage::Dev,
        )
    }

    fn job_for(topic_id: &str) -> AsyncJob {
        AsyncJob::new(
            "tenant-a".to_string(),
            "user-1".to_string(),
            topic_id.to_string(),
            serde_json::json!({}),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn retries_exhausted_fails_without_invoking_the_executor() {
        let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let worker = build_worker(store.clone(), calls.clone());

        let mut job = job_for("niche_review");
        job.attempts = MAX_ATTEMPTS;
        store.create(job.clone()).await.unwrap();

        worker.process_one(job.job_id).await.unwrap();

        let updated = store.get(&job.job_id).await.unwrap().unwrap();
        assert_eq!(updated.status, JobStatus::Failed);
        assert_eq!(updated.error_code.as_deref(), Some("RETRIES_EXHAUSTED"));
        assert_eq!(calls.load(Ordering::SeqCst), 0, "exhausted job must not invoke the LLM");
    }

    #[tokio::test]
    async fn duplicate_dispatch_of_a_completed_job_is_a_no_op() {
        let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let worker = build_worker(store.clone(), calls.clone());

        let job = job_for("niche_review");
        store.create(job.clone()).await.unwrap();

        worker.process_one(job.job_id).await.unwrap();
        let first = store.get(&job.job_id).await.unwrap().unwrap();
        assert_eq!(first.status, JobStatus::Completed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // A redelivered dispatch message for the same (now terminal) job
        // must not reprocess it.
        worker.process_one(job.job_id).await.unwrap();
        let second = store.get(&job.job_id).await.unwrap().unwrap();
        assert_eq!(second.status, JobStatus::Completed);
        assert_eq!(calls.load(Ordering::SeqCst), 1, "terminal job must not be re-executed");
    }

    #[tokio::test]
    async fn cas_conflict_on_claim_is_swallowed_as_a_no_op() {
        let inner = InMemoryJobStore::new();
        let job = job_for("niche_review");
        inner.create(job.clone()).await.unwrap();
        let store: Arc<dyn JobStore> = Arc::new(ConflictingStore(inner));
        let calls = Arc::new(AtomicUsize::new(0));
        let worker = build_worker(store, calls.clone());

        let result = worker.process_one(job.job_id).await;
        assert!(result.is_ok(), "a CAS conflict on the PENDING->PROCESSING claim must not surface as an error");
        assert_eq!(calls.load(Ordering::SeqCst), 0, "a lost claim race must not invoke the LLM");
    }
}
