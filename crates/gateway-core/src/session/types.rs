use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionStatus {
    Active,
    Paused,
    Completed,
    Cancelled,
    Abandoned,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::Completed
                | SessionStatus::Cancelled
                | SessionStatus::Abandoned
                | SessionStatus::Failed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub tokens: Option<u32>,
}

pub type SessionId = Uuid;

const SESSION_LIFETIME_DAYS: i64 = 14;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    pub session_id: SessionId,
    pub tenant_id: String,
    pub user_id: String,
    pub topic_id: String,
    pub status: SessionStatus,
    pub turn: u32,
    pub max_turns: u32,
    pub messages: Vec<SessionMessage>,
    pub context: Value,
    pub result: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ConversationSession {
    pub fn new(
        tenant_id: String,
        user_id: String,
        topic_id: String,
        max_turns: u32,
        context: Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            tenant_id,
            user_id,
            topic_id,
            status: SessionStatus::Active,
            turn: 0,
            max_turns,
            messages: Vec::new(),
            context,
            result: None,
            created_at: now,
            updated_at: now,
            last_activity_at: now,
            expires_at: now + ChronoDuration::days(SESSION_LIFETIME_DAYS),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Presentation-only derivation (spec §3.4): an ACTIVE session whose
    /// last activity predates the idle timeout is reported as "paused",
    /// while its stored `status` stays ACTIVE.
    pub fn computed_status(&self, now: DateTime<Utc>, idle_timeout: chrono::Duration) -> SessionStatus {
        if self.status == SessionStatus::Active && now - self.last_activity_at > idle_timeout {
            SessionStatus::Paused
        } else {
            self.status
        }
    }

    pub fn is_idle(&self, now: DateTime<Utc>, idle_timeout: chrono::Duration) -> bool {
        self.status == SessionStatus::Active && now - self.last_activity_at > idle_timeout
    }
}
