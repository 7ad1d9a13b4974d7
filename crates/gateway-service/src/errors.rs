//! HTTP boundary error mapping (SPEC_FULL §11): the *only* place a
//! `GatewayError` turns into a status code and a `{detail: {code,
//! message}}` body, mirroring the teacher's separation of internal
//! `Result<T, LLMError>` from the axum-facing error type in
//! `service/src/main.rs`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gateway_core::error::GatewayError;
use serde_json::json;

pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let body = Json(json!({
            "success": false,
            "detail": { "code": self.0.code(), "message": self.0.to_string() },
        }));
        (status, body).into_response()
    }
}

fn status_for(err: &GatewayError) -> StatusCode {
    use GatewayError::*;
    match err {
        TopicNotFound(_) | ResponseModelNotFound(_) | SessionNotFound(_) | JobNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        TopicInactive(_) | WrongTopicType(_) | SessionNotActive => StatusCode::BAD_REQUEST,
        MissingParameter { .. } | ParameterMalformed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        SessionAccessDenied | JobAccessDenied => StatusCode::FORBIDDEN,
        SessionConflict { .. } => StatusCode::CONFLICT,
        SessionExpired => StatusCode::GONE,
        MaxTurnsReached => StatusCode::UNPROCESSABLE_ENTITY,
        ExtractionFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RetriesExhausted | ProcessingTimeout => StatusCode::UNPROCESSABLE_ENTITY,
        RequestTimeout => StatusCode::REQUEST_TIMEOUT,
        SourceUnavailable { .. } | SourceEmpty(_) | SourceTimeout(_) => StatusCode::BAD_GATEWAY,
        TemplateNotFound { .. } | TemplateUnresolved(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ProviderUnavailable(_) | ProviderTimeout | ProviderRateLimited | ProviderRefused(_) => {
            StatusCode::BAD_GATEWAY
        }
        ProviderMalformedOutput(_) | LLMOutputInvalid { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
