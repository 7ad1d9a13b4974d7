//! Bearer-token extraction (spec §6.1: "all require a bearer token
//! providing `(tenant_id, user_id, roles)`"). Real auth middleware
//! internals are out of scope (spec §1); this is a stand-in that trusts a
//! `tenant_id:user_id` bearer token, the same trust boundary an API
//! gateway or load balancer would otherwise enforce upstream.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use gateway_core::enrichment::CallerContext;

pub struct AuthenticatedCaller(pub CallerContext);

impl<S> FromRequestParts<S> for AuthenticatedCaller
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .ok_or((StatusCode::UNAUTHORIZED, "missing authorization header".to_string()))?;
        let value = header
            .to_str()
            .map_err(|_| (StatusCode::UNAUTHORIZED, "malformed authorization header".to_string()))?;
        let token = value
            .strip_prefix("Bearer ")
            .ok_or((StatusCode::UNAUTHORIZED, "expected a bearer token".to_string()))?;
        let (tenant_id, user_id) = token
            .split_once(':')
            .ok_or((StatusCode::UNAUTHORIZED, "malformed bearer token".to_string()))?;
        if tenant_id.is_empty() || user_id.is_empty() {
            return Err((StatusCode::UNAUTHORIZED, "malformed bearer token".to_string()));
        }
        Ok(AuthenticatedCaller(CallerContext {
            tenant_id: tenant_id.to_string(),
            user_id: user_id.to_string(),
        }))
    }
}
