use super::store::{JobStore, JobStoreError};
use super::types::{AsyncJob, JobId, JobStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: Mutex<HashMap<JobId, AsyncJob>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, job: AsyncJob) -> Result<(), JobStoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        if jobs.contains_key(&job.job_id) {
            return Err(JobStoreError::Conflict(format!("job already exists: {}", job.job_id)));
        }
        jobs.insert(job.job_id, job);
        Ok(())
    }

    async fn get(&self, job_id: &JobId) -> Result<Option<AsyncJob>, JobStoreError> {
        Ok(self.jobs.lock().unwrap().get(job_id).cloned())
    }

    async fn compare_and_update(
        &self,
        job: AsyncJob,
        expected_status: JobStatus,
    ) -> Result<(), JobStoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        let current = jobs.get(&job.job_id).ok_or(JobStoreError::NotFound(job.job_id))?;
        if current.status != expected_status {
            return Err(JobStoreError::Conflict(format!(
                "expected status {:?}, found {:?}",
                expected_status, current.status
            )));
        }
        jobs.insert(job.job_id, job);
        Ok(())
    }

    async fn list_by_tenant(&self, tenant_id: &str, limit: usize) -> Result<Vec<AsyncJob>, JobStoreError> {
        let mut out: Vec<AsyncJob> = self
            .jobs
            .lock()
            .unwrap()
            .values()
            .filter(|j| j.tenant_id == tenant_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out.truncate(limit);
        Ok(out)
    }

    async fn find_stuck_processing(&self, now: DateTime<Utc>) -> Result<Vec<JobId>, JobStoreError> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .values()
            .filter(|j| j.is_processing_timed_out(now))
            .map(|j| j.job_id)
            .collect())
    }
}
