use super::types::{ConversationSession, SessionId, SessionStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("session not found: {0}")]
    NotFound(SessionId),
    #[error("session store conflict: {0}")]
    Conflict(String),
    #[error("session store error: {0}")]
    Other(String),
}

/// Abstracts asynchronous session storage. A concrete backend (Postgres,
/// DynamoDB, ...) must support conditional writes on `status` — without
/// that guarantee the mutual-exclusion invariants in spec §3.4/§5 cannot
/// be enforced.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: ConversationSession) -> Result<(), SessionStoreError>;

    async fn get(&self, session_id: &SessionId) -> Result<Option<ConversationSession>, SessionStoreError>;

    /// Full replace, conditioned on `expected_status` matching the
    /// currently stored status. Returns `Conflict` if it doesn't — this is
    /// the compare-and-set primitive the engine uses for every
    /// state-creating transition.
    async fn compare_and_update(
        &self,
        session: ConversationSession,
        expected_status: SessionStatus,
    ) -> Result<(), SessionStoreError>;

    /// Non-terminal sessions for `(tenant_id, topic_id)`, any owner.
    async fn find_non_terminal_by_tenant_topic(
        &self,
        tenant_id: &str,
        topic_id: &str,
    ) -> Result<Vec<ConversationSession>, SessionStoreError>;

    async fn list_by_user(
        &self,
        tenant_id: &str,
        user_id: &str,
        include_completed: bool,
        limit: usize,
    ) -> Result<Vec<ConversationSession>, SessionStoreError>;

    /// Non-terminal sessions whose `expires_at` is before `now`, for the
    /// abandon sweep (spec §4.8).
    async fn find_expirable(&self, now: DateTime<Utc>) -> Result<Vec<SessionId>, SessionStoreError>;
}
