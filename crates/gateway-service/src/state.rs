use gateway_core::enrichment::EnrichmentSources;
use gateway_core::executor::Executor;
use gateway_core::job::{InMemoryJobQueue, InMemoryJobStore, JobWorker, LoggingEventPublisher, Stage};
use gateway_core::llm::ProviderResolver;
use gateway_core::prompt::PromptRenderer;
use gateway_core::schema::catalog as schema_catalog;
use gateway_core::schema::ResponseModelRegistry;
use gateway_core::session::{InMemorySessionStore, SessionEngine};
use gateway_core::topic::{catalog as topic_catalog, NoopRuntimeConfigStore, TopicRegistry};
use std::sync::Arc;

use crate::providers::StaticProviderResolver;
use crate::templates::StaticTemplateStore;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<TopicRegistry>,
    pub schemas: Arc<ResponseModelRegistry>,
    pub executor: Arc<Executor>,
    pub sessions: Arc<SessionEngine>,
    pub jobs: Arc<JobWorker>,
}

/// Wires every module from `gateway-core` together the way `main()` would
/// in a larger deployment: static catalogue + in-memory stores + the three
/// provider crates. Swapping in persistent stores only touches this
/// function.
pub fn build(stage: Stage, tenant_concurrency_limit: u32, sources: EnrichmentSources) -> AppState {
    let registry = Arc::new(
        TopicRegistry::new(topic_catalog::sample_topics(), Arc::new(NoopRuntimeConfigStore))
            .expect("sample topic catalogue is internally consistent"),
    );

    let mut schemas = ResponseModelRegistry::new();
    schemas.register("NicheReviewResult", schema_catalog::niche_review_result());
    schemas.register("AlignmentCheckResult", schema_catalog::alignment_check_result());
    schemas.register("CoreValuesResult", schema_catalog::core_values_result());
    schemas.register("PurposeResult", schema_catalog::purpose_result());
    schemas.register("VisionResult", schema_catalog::vision_result());
    let schemas = Arc::new(schemas);

    let prompts = Arc::new(PromptRenderer::new(Box::new(StaticTemplateStore::new())));
    let providers: Arc<dyn ProviderResolver> = Arc::new(StaticProviderResolver::from_env());
    let sources = Arc::new(sources);

    let executor = Arc::new(Executor::new(
        registry.clone(),
        schemas.clone(),
        prompts.clone(),
        providers.clone(),
        sources.clone(),
    ));

    let sessions = Arc::new(SessionEngine::new(
        Arc::new(InMemorySessionStore::default()),
        registry.clone(),
        schemas.clone(),
        prompts,
        providers,
        sources,
    ));

    let queue = InMemoryJobQueue::new(tenant_concurrency_limit);
    let jobs = Arc::new(JobWorker::new(
        Arc::new(InMemoryJobStore::default()),
        queue,
        executor.clone(),
        Arc::new(LoggingEventPublisher),
        stage,
    ));

    AppState { registry, schemas, executor, sessions, jobs }
}
