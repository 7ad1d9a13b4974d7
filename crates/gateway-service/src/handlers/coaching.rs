//! `/ai/coaching/*` (spec §4.8, §6.1): the conversation session state
//! machine's HTTP surface.

use crate::auth::AuthenticatedCaller;
use crate::errors::ApiError;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::Json;
use gateway_core::session::{ConversationSession, SessionStatus};
use gateway_core::topic::{TopicFilter, TopicType};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

/// Session statuses are stored UPPERCASE (spec §3.4, §4.8 prose: `ACTIVE`,
/// `PAUSED`, ...) but the documented HTTP examples use lowercase (spec §8
/// property 6: `status: "paused"`, `actual_status: "active"`). Lowercase at
/// the boundary rather than changing the stored representation.
fn lower(status: SessionStatus) -> String {
    serde_json::to_value(status).expect("SessionStatus always serializes").as_str().expect("string").to_lowercase()
}

fn session_json(session: &ConversationSession) -> Value {
    let messages: Vec<Value> = session
        .messages
        .iter()
        .map(|m| {
            json!({
                "role": serde_json::to_value(m.role).expect("MessageRole always serializes").as_str().expect("string").to_lowercase(),
                "content": m.content,
                "timestamp": m.timestamp,
                "tokens": m.tokens,
            })
        })
        .collect();
    json!({
        "session_id": session.session_id,
        "tenant_id": session.tenant_id,
        "user_id": session.user_id,
        "topic_id": session.topic_id,
        "status": lower(session.status),
        "turn": session.turn,
        "max_turns": session.max_turns,
        "messages": messages,
        "context": session.context,
        "result": session.result,
        "created_at": session.created_at,
        "updated_at": session.updated_at,
        "last_activity_at": session.last_activity_at,
        "expires_at": session.expires_at,
    })
}

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub topic_id: String,
    #[serde(default)]
    pub context: Value,
}

pub async fn start(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Json(body): Json<StartRequest>,
) -> Result<Json<Value>, ApiError> {
    let session = state.sessions.start(&caller, &body.topic_id, body.context).await?;
    Ok(Json(json!({ "success": true, "data": session_json(&session) })))
}

#[derive(Debug, Deserialize)]
pub struct SessionIdRequest {
    pub session_id: Uuid,
}

pub async fn resume(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Json(body): Json<SessionIdRequest>,
) -> Result<Json<Value>, ApiError> {
    let session = state.sessions.resume(&caller, body.session_id).await?;
    Ok(Json(json!({ "success": true, "data": session_json(&session) })))
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub session_id: Uuid,
    pub message: String,
}

pub async fn message(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Json(body): Json<MessageRequest>,
) -> Result<Json<Value>, ApiError> {
    let session = state.sessions.message(&caller, body.session_id, body.message).await?;
    Ok(Json(json!({ "success": true, "data": session_json(&session) })))
}

pub async fn pause(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Json(body): Json<SessionIdRequest>,
) -> Result<Json<Value>, ApiError> {
    let session = state.sessions.pause(&caller, body.session_id).await?;
    Ok(Json(json!({ "success": true, "data": session_json(&session) })))
}

pub async fn complete(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Json(body): Json<SessionIdRequest>,
) -> Result<Json<Value>, ApiError> {
    let session = state.sessions.complete(&caller, body.session_id).await?;
    Ok(Json(json!({ "success": true, "data": session_json(&session) })))
}

pub async fn cancel(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Json(body): Json<SessionIdRequest>,
) -> Result<Json<Value>, ApiError> {
    let session = state.sessions.cancel(&caller, body.session_id).await?;
    Ok(Json(json!({ "success": true, "data": session_json(&session) })))
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session_id: Uuid,
}

pub async fn get_session(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Query(query): Query<SessionQuery>,
) -> Result<Json<Value>, ApiError> {
    let session = state.sessions.get(&caller, query.session_id).await?;
    Ok(Json(json!({ "success": true, "data": session_json(&session) })))
}

#[derive(Debug, Deserialize)]
pub struct ListSessionsQuery {
    #[serde(default)]
    pub include_completed: bool,
    #[serde(default = "default_list_limit")]
    pub limit: usize,
}

fn default_list_limit() -> usize {
    50
}

pub async fn list_sessions(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Query(query): Query<ListSessionsQuery>,
) -> Result<Json<Value>, ApiError> {
    let sessions = state.sessions.list(&caller, query.include_completed, query.limit).await?;
    let sessions: Vec<Value> = sessions.iter().map(session_json).collect();
    Ok(Json(json!({ "success": true, "data": sessions })))
}

#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    pub topic_id: String,
}

pub async fn check(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Query(query): Query<CheckQuery>,
) -> Result<Json<Value>, ApiError> {
    let result = state.sessions.check(&caller, &query.topic_id).await?;
    Ok(Json(json!({
        "success": true,
        "data": {
            "has_session": result.has_session,
            "session_id": result.session_id,
            "status": result.status.map(lower),
            "actual_status": result.actual_status.map(lower),
            "is_idle": result.is_idle,
            "conflict": result.conflict,
            "conflict_user_id": result.conflict_user_id,
        },
    })))
}

pub async fn list_topics(State(state): State<AppState>) -> Json<Value> {
    let filter = TopicFilter {
        topic_type: Some(TopicType::ConversationCoaching),
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
                "max_turns": topic.runtime_config.max_turns,
            })
        })
        .collect();
    Json(json!({ "success": true, "data": topics }))
}
