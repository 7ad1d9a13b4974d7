//! `POST /ai/execute-async`, `GET /ai/jobs/{job_id}` (spec §4.7, §6.1).

use crate::auth::AuthenticatedCaller;
use crate::errors::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use gateway_core::job::{AsyncJob, JobStatus};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// Job/session status enums are stored UPPERCASE (spec §3/§4 prose: `PENDING`,
/// `ACTIVE`, ...) but the documented HTTP examples use lowercase (spec §6.1,
/// §8 property 2: `status: "pending"` / `"completed"`). Lowercase at the
/// boundary rather than changing the stored representation.
fn lower(status: JobStatus) -> String {
    serde_json::to_value(status).expect("JobStatus always serializes").as_str().expect("string").to_lowercase()
}

fn job_json(job: &AsyncJob) -> Value {
    json!({
        "job_id": job.job_id,
        "tenant_id": job.tenant_id,
        "user_id": job.user_id,
        "topic_id": job.topic_id,
        "status": lower(job.status),
        "result": job.result,
        "error": job.error,
        "error_code": job.error_code,
        "created_at": job.created_at,
        "started_at": job.started_at,
        "completed_at": job.completed_at,
        "processing_time_ms": job.processing_time_ms,
        "attempts": job.attempts,
    })
}

#[derive(Debug, Deserialize)]
pub struct ExecuteAsyncRequest {
    pub topic_id: String,
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
}

pub async fn execute_async(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Json(body): Json<ExecuteAsyncRequest>,
) -> Result<Json<Value>, ApiError> {
    let parameters = serde_json::to_value(&body.parameters).map_err(gateway_core::GatewayError::from)?;
    let job = state.jobs.enqueue(&caller, &body.topic_id, parameters).await?;
    let estimated_duration_ms = state
        .registry
        .merge_runtime_config(&body.topic_id)
        .await
        .ok()
        .and_then(|cfg| cfg.timeout)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(30_000);

    Ok(Json(json!({
        "success": true,
        "data": {
            "job_id": job.job_id,
            "status": "pending",
            "topic_id": job.topic_id,
            "estimated_duration_ms": estimated_duration_ms,
        },
    })))
}

pub async fn get_job(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(job_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let job = state.jobs.get(&caller, job_id).await?;
    Ok(Json(json!({ "success": true, "data": job_json(&job) })))
}
