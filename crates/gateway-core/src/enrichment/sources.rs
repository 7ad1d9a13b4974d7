use crate::topic::ParameterSource;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct CallerContext {
    pub tenant_id: String,
    pub user_id: String,
}

/// The result of a single grouped fetch. A "recoverable not-found" (spec
/// §4.3: e.g. the requested `goal_id` does not exist) is represented as an
/// empty payload rather than an error.
#[derive(Debug, Clone)]
pub struct SourcePayload {
    pub value: Value,
    empty: bool,
}

impl SourcePayload {
    pub fn present(value: Value) -> Self {
        Self { value, empty: false }
    }

    pub fn empty() -> Self {
        Self { value: Value::Null, empty: true }
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }
}

/// One external collaborator fetch, scoped minimally (tenant + optional
/// selector drawn from the request, e.g. `goal_id`) per spec §4.3 step 4.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(
        &self,
        caller: &CallerContext,
        selector: Option<&str>,
    ) -> Result<SourcePayload, String>;
}

/// Registry of fetchers keyed by `ParameterSource`. `CONVERSATION` is
/// handled outside this registry by the pipeline itself.
#[derive(Default, Clone)]
pub struct EnrichmentSources {
    fetchers: HashMap<ParameterSource, Arc<dyn SourceFetcher>>,
}

impl EnrichmentSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, source: ParameterSource, fetcher: Arc<dyn SourceFetcher>) {
        self.fetchers.insert(source, fetcher);
    }

    pub async fn fetch(
        &self,
        source: ParameterSource,
        caller: &CallerContext,
        selector: Option<&str>,
    ) -> Result<SourcePayload, String> {
        match self.fetchers.get(&source) {
            Some(fetcher) => fetcher.fetch(caller, selector).await,
            None => Err(format!("no fetcher registered for source {source:?}")),
        }
    }
}
