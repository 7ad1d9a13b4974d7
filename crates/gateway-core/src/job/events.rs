//! Event envelope published after terminal job transitions (spec §6.2).
//! Publication is at-least-once; consumers are expected to dedupe by
//! `job_id`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Dev,
    Staging,
    Prod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobEventType {
    #[serde(rename = "ai.job.completed")]
    Completed,
    #[serde(rename = "ai.job.failed")]
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEventData {
    pub job_id: Uuid,
    pub topic_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEvent {
    pub event_type: JobEventType,
    pub job_id: Uuid,
    pub tenant_id: String,
    pub user_id: String,
    pub topic_id: String,
    pub data: JobEventData,
    pub stage: Stage,
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: JobEvent) -> Result<(), String>;
}

/// Logs the event and drops it. The real fan-out bus is out of scope
/// (spec §1, "the WebSocket delivery layer"); this is the default for
/// tests and single-process deployments.
pub struct LoggingEventPublisher;

#[async_trait]
impl EventPublisher for LoggingEventPublisher {
    async fn publish(&self, event: JobEvent) -> Result<(), String> {
        tracing::info!(
            event_type = ?event.event_type,
            job_id = %event.job_id,
            tenant_id = %event.tenant_id,
            "published job event"
        );
        Ok(())
    }
}
