//! Collaborator contracts consumed (spec §6.3): one trait per downstream
//! fetch shape, implemented once over HTTP (`http.rs`) and once as an
//! in-memory fake (`fakes.rs`) for tests and the `LOCAL`-only demo.

use crate::error::CollaboratorError;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait BusinessFoundationClient: Send + Sync {
    /// `(tenant_id) -> {vision, purpose, core_values, icas, pillars,
    /// industry, business_type, business_stage}`, or `None` if not found.
    async fn fetch(&self, tenant_id: &str) -> Result<Option<Value>, CollaboratorError>;
}

#[async_trait]
pub trait GoalsClient: Send + Sync {
    /// `(tenant_id, goal_id?) -> goal | goals[]`.
    async fn fetch(&self, tenant_id: &str, goal_id: Option<&str>) -> Result<Value, CollaboratorError>;
}

#[async_trait]
pub trait StrategiesClient: Send + Sync {
    /// `(tenant_id, goal_id?) -> strategies[]`.
    async fn fetch(&self, tenant_id: &str, goal_id: Option<&str>) -> Result<Value, CollaboratorError>;
}

#[async_trait]
pub trait MeasuresClient: Send + Sync {
    /// `(tenant_id, measure_id?) -> measure | measures[] | measures_summary`.
    async fn fetch(&self, tenant_id: &str, measure_id: Option<&str>) -> Result<Value, CollaboratorError>;
}

#[async_trait]
pub trait ActionsClient: Send + Sync {
    /// `(tenant_id, action_id) -> action`.
    async fn fetch(&self, tenant_id: &str, action_id: &str) -> Result<Value, CollaboratorError>;
}

#[async_trait]
pub trait IssuesClient: Send + Sync {
    /// `(tenant_id, issue_id) -> issue`.
    async fn fetch(&self, tenant_id: &str, issue_id: &str) -> Result<Value, CollaboratorError>;
}

#[async_trait]
pub trait WebsiteClient: Send + Sync {
    /// `(url) -> {content, title, meta_description}`, or a
    /// `CollaboratorError` on `fetch_failed`.
    async fn fetch(&self, url: &str) -> Result<Value, CollaboratorError>;
}
