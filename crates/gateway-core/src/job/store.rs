use super::types::{AsyncJob, JobId, JobStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job store conflict: {0}")]
    Conflict(String),
    #[error("job store error: {0}")]
    Other(String),
}

/// Abstracts asynchronous job storage. Mirrors `SessionStore`'s
/// compare-and-set contract: a concrete backend must support conditional
/// writes on `status` to enforce "at most one worker holds a job in
/// PROCESSING" (spec §3.5).
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, job: AsyncJob) -> Result<(), JobStoreError>;

    async fn get(&self, job_id: &JobId) -> Result<Option<AsyncJob>, JobStoreError>;

    async fn compare_and_update(
        &self,
        job: AsyncJob,
        expected_status: JobStatus,
    ) -> Result<(), JobStoreError>;

    async fn list_by_tenant(&self, tenant_id: &str, limit: usize) -> Result<Vec<AsyncJob>, JobStoreError>;

    /// Jobs stuck in PROCESSING past the per-job cap, for the
    /// processing-timeout sweep.
    async fn find_stuck_processing(&self, now: DateTime<Utc>) -> Result<Vec<JobId>, JobStoreError>;
}
