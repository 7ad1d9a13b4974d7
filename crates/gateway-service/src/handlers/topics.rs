//! `GET /ai/topics` and `GET /ai/schemas/{name}` (spec §6.1).

use crate::errors::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use gateway_core::schema::to_json_schema;
use gateway_core::topic::{TopicFilter, TopicType};
use serde_json::{json, Value};

pub async fn list_topics(State(state): State<AppState>) -> Json<Value> {
    let filter = TopicFilter {
        topic_type: Some(TopicType::SingleShot),
        category: None,
        active_only: true,
    };
    let topics: Vec<Value> = state
        .registry
        .list(&filter)
        .into_iter()
        .map(|topic| {
            json!({
                "topic_id": topic.topic_id,
                "category": topic.category,
                "description": topic.description,
                "response_model_ref": topic.response_model_ref,
                "parameters": topic.parameter_refs,
            })
        })
        .collect();
    Json(json!({ "success": true, "data": topics }))
}

pub async fn get_schema(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let schema = state.schemas.get_schema(&name)?;
    Ok(Json(json!({ "success": true, "data": to_json_schema(schema) })))
}
