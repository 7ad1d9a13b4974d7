use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }
}

pub type JobId = Uuid;

/// Attempts beyond this transition the job directly to FAILED with
/// `RETRIES_EXHAUSTED` rather than running another execution (spec §4.7).
pub const MAX_ATTEMPTS: u32 = 3;

/// Per-job processing cap (spec §5): a job stuck in PROCESSING past this
/// is swept to FAILED with `PROCESSING_TIMEOUT`.
pub const PROCESSING_TIMEOUT_MINUTES: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsyncJob {
    pub job_id: JobId,
    pub tenant_id: String,
    pub user_id: String,
    pub topic_id: String,
    pub parameters: Value,
    pub status: JobStatus,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub error_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub processing_time_ms: Option<u64>,
    pub attempts: u32,
}

impl AsyncJob {
    pub fn new(
        tenant_id: String,
        user_id: String,
        topic_id: String,
        parameters: Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            tenant_id,
            user_id,
            topic_id,
            parameters,
            status: JobStatus::Pending,
            result: None,
            error: None,
            error_code: None,
            created_at: now,
            started_at: None,
            completed_at: None,
            processing_time_ms: None,
            attempts: 0,
        }
    }

    pub fn is_processing_timed_out(&self, now: DateTime<Utc>) -> bool {
        match self.started_at {
            Some(started) => {
                self.status == JobStatus::Processing
                    && now - started > ChronoDuration::minutes(PROCESSING_TIMEOUT_MINUTES)
            }
            None => false,
        }
    }
}
