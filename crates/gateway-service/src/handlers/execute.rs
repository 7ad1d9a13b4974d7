//! `POST /ai/execute` (spec §4.6, §6.1): the synchronous single-shot path.

use crate::auth::AuthenticatedCaller;
use crate::errors::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use gateway_core::GatewayError;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

/// Request-level timeout for the synchronous executor (spec §5): async jobs
/// enforce a separate 5-minute processing cap instead, so this lives at the
/// handler boundary rather than inside `Executor::execute` itself.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub topic_id: String,
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
}

pub async fn execute(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Json(body): Json<ExecuteRequest>,
) -> Result<Json<Value>, ApiError> {
    let outcome = tokio::time::timeout(
        REQUEST_TIMEOUT,
        state.executor.execute(&body.topic_id, &body.parameters, &caller),
    )
    .await
    .map_err(|_| ApiError(GatewayError::RequestTimeout))??;

    Ok(Json(json!({
        "topic_id": body.topic_id,
        "success": true,
        "data": outcome.data,
        "schema_ref": outcome.schema_ref,
        "metadata": {
            "model": outcome.model,
            "tokens_used": outcome.tokens_used,
            "processing_time_ms": outcome.processing_time_ms,
            "finish_reason": outcome.finish_reason,
        },
    })))
}
