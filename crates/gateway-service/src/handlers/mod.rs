pub mod coaching;
pub mod execute;
pub mod jobs;
pub mod topics;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ai/execute", post(execute::execute))
        .route("/ai/topics", get(topics::list_topics))
        .route("/ai/schemas/:name", get(topics::get_schema))
        .route("/ai/execute-async", post(jobs::execute_async))
        .route("/ai/jobs/:job_id", get(jobs::get_job))
        .route("/ai/coaching/start", post(coaching::start))
        .route("/ai/coaching/resume", post(coaching::resume))
        .route("/ai/coaching/message", post(coaching::message))
        .route("/ai/coaching/pause", post(coaching::pause))
        .route("/ai/coaching/complete", post(coaching::complete))
        .route("/ai/coaching/cancel", post(coaching::cancel))
        .route("/ai/coaching/session", get(coaching::get_session))
        .route("/ai/coaching/sessions", get(coaching::list_sessions))
        .route("/ai/coaching/session/check", get(coaching::check))
        .route("/ai/coaching/topics", get(coaching::list_topics))
        .with_state(state)
}
