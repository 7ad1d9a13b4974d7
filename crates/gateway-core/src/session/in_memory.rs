use super::store::{SessionStore, SessionStoreError};
use super::types::{ConversationSession, SessionId, SessionStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// An in-memory `SessionStore`, the default backend for tests and for the
/// single-process demo deployment — mirrors the teacher's
/// `InMemorySessionStore` role for `SessionStore`.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<SessionId, ConversationSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, session: ConversationSession) -> Result<(), SessionStoreError> {
        let mut sessions = self.sessions.lock().unwrap();
        if sessions.contains_key(&session.session_id) {
            return Err(SessionStoreError::Conflict(format!(
                "session already exists: {}",
                session.session_id
            )));
        }
        sessions.insert(session.session_id, session);
        Ok(())
    }

    async fn get(&self, session_id: &SessionId) -> Result<Option<ConversationSession>, SessionStoreError> {
        Ok(self.sessions.lock().unwrap().get(session_id).cloned())
    }

    async fn compare_and_update(
        &self,
        session: ConversationSession,
        expected_status: SessionStatus,
    ) -> Result<(), SessionStoreError> {
        let mut sessions = self.sessions.lock().unwrap();
        let current = sessions
            .get(&session.session_id)
            .ok_or(SessionStoreError::NotFound(session.session_id))?;
        if current.status != expected_status {
            return Err(SessionStoreError::Conflict(format!(
                "expected status {:?}, found {:?}",
                expected_status, current.status
            )));
        }
        sessions.insert(session.session_id, session);
        Ok(())
    }

    async fn find_non_terminal_by_tenant_topic(
        &self,
        tenant_id: &str,
        topic_id: &str,
    ) -> Result<Vec<ConversationSession>, SessionStoreError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.tenant_id == tenant_id && s.topic_id == topic_id && !s.status.is_terminal())
            .cloned()
            .collect())
    }

    async fn list_by_user(
        &self,
        tenant_id: &str,
        user_id: &str,
        include_completed: bool,
        limit: usize,
    ) -> Result<Vec<ConversationSession>, SessionStoreError> {
        let mut out: Vec<ConversationSession> = self
            .sessions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.tenant_id == tenant_id && s.user_id == user_id)
            .filter(|s| include_completed || !s.status.is_terminal())
            .cloned()
            .collect();
        out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        out.truncate(limit);
        Ok(out)
    }

    async fn find_expirable(&self, now: DateTime<Utc>) -> Result<Vec<SessionId>, SessionStoreError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .values()
            .filter(|s| !s.status.is_terminal() && s.is_expired(now))
            .map(|s| s.session_id)
            .collect())
    }
}
