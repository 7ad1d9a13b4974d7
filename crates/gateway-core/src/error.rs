//! Shared error taxonomy for the gateway engine.
//!
//! One enum, one variant per kind from the spec's error taxonomy. HTTP
//! status mapping happens only at the axum boundary in `gateway-service`;
//! everything below this layer returns `Result<_, GatewayError>`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("topic not found: {0}")]
    TopicNotFound(String),

    #[error("topic inactive: {0}")]
    TopicInactive(String),

    #[error("wrong topic type for this operation: {0}")]
    WrongTopicType(String),

    #[error("missing required parameter '{name}' from source {source:?}")]
    MissingParameter {
        name: String,
        source: Option<String>,
    },

    #[error("parameter '{name}' malformed: {reason}")]
    ParameterMalformed { name: String, reason: String },

    #[error("source {source} unavailable: {cause}")]
    SourceUnavailable { source: String, cause: String },

    #[error("source {0} returned no data")]
    SourceEmpty(String),

    #[error("source {0} timed out")]
    SourceTimeout(String),

    #[error("template not found for topic {topic_id} role {role}")]
    TemplateNotFound { topic_id: String, role: String },

    #[error("template placeholder '{0}' has no matching context entry")]
    TemplateUnresolved(String),

    #[error("response model '{0}' is not registered")]
    ResponseModelNotFound(String),

    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("provider timed out")]
    ProviderTimeout,

    #[error("provider rate limited")]
    ProviderRateLimited,

    #[error("provider refused the request: {0}")]
    ProviderRefused(String),

    #[error("provider returned malformed output: {0}")]
    ProviderMalformedOutput(String),

    #[error("LLM output failed schema validation at {path}: expected {expected}, got {actual}")]
    LLMOutputInvalid {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session access denied")]
    SessionAccessDenied,

    #[error("session is not active")]
    SessionNotActive,

    #[error("session conflict: user {conflict_user_id} already holds a session")]
    SessionConflict { conflict_user_id: String },

    #[error("session expired")]
    SessionExpired,

    #[error("max turns reached")]
    MaxTurnsReached,

    #[error("result extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("job access denied")]
    JobAccessDenied,

    #[error("job retries exhausted")]
    RetriesExhausted,

    #[error("job processing timed out")]
    ProcessingTimeout,

    #[error("request timed out")]
    RequestTimeout,

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Stable machine-readable code, as surfaced in `{detail: {code, ...}}`.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::TopicNotFound(_) => "TopicNotFound",
            GatewayError::TopicInactive(_) => "TopicInactive",
            GatewayError::WrongTopicType(_) => "WrongTopicType",
            GatewayError::MissingParameter { .. } => "MissingParameter",
            GatewayError::ParameterMalformed { .. } => "ParameterMalformed",
            GatewayError::SourceUnavailable { .. } => "SourceUnavailable",
            GatewayError::SourceEmpty(_) => "SourceEmpty",
            GatewayError::SourceTimeout(_) => "SourceTimeout",
            GatewayError::TemplateNotFound { .. } => "TemplateNotFound",
            GatewayError::TemplateUnresolved(_) => "TemplateUnresolved",
            GatewayError::ResponseModelNotFound(_) => "ResponseModelNotFound",
            GatewayError::ProviderUnavailable(_) => "ProviderUnavailable",
            GatewayError::ProviderTimeout => "ProviderTimeout",
            GatewayError::ProviderRateLimited => "ProviderRateLimited",
            GatewayError::ProviderRefused(_) => "ProviderRefused",
            GatewayError::ProviderMalformedOutput(_) => "ProviderMalformedOutput",
            GatewayError::LLMOutputInvalid { .. } => "LLMOutputInvalid",
            GatewayError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            GatewayError::SessionAccessDenied => "SESSION_ACCESS_DENIED",
            GatewayError::SessionNotActive => "SESSION_NOT_ACTIVE",
            GatewayError::SessionConflict { .. } => "SESSION_CONFLICT",
            GatewayError::SessionExpired => "SESSION_EXPIRED",
            GatewayError::MaxTurnsReached => "MAX_TURNS_REACHED",
            GatewayError::ExtractionFailed(_) => "EXTRACTION_FAILED",
            GatewayError::JobNotFound(_) => "JOB_NOT_FOUND",
            GatewayError::JobAccessDenied => "JOB_ACCESS_DENIED",
            GatewayError::RetriesExhausted => "RETRIES_EXHAUSTED",
            GatewayError::ProcessingTimeout => "PROCESSING_TIMEOUT",
            GatewayError::RequestTimeout => "RequestTimeout",
            GatewayError::Internal(_) => "InternalError",
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Internal(format!("json error: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
