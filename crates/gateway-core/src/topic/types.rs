use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TopicType {
    SingleShot,
    ConversationCoaching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TopicCategory {
    Onboarding,
    StrategicPlanning,
    Operations,
    Analysis,
    Insights,
    Coaching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParameterSource {
    Request,
    Onboarding,
    Goal,
    Goals,
    Measure,
    Measures,
    Action,
    Issue,
    Strategies,
    Conversation,
    Website,
    Computed,
}

impl ParameterSource {
    /// `Request` parameters are read straight from the caller's body; every
    /// other source requires exactly one enrichment fetch per distinct
    /// variant present in a topic's parameter list (spec §4.3 step 4).
    pub fn is_fetched(&self) -> bool {
        !matches!(self, ParameterSource::Request | ParameterSource::Computed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDef {
    pub name: String,
    pub source: ParameterSource,
    /// Dotted path applied to the source payload; ignored for `Request` and
    /// `Computed` parameters.
    pub extraction_path: Option<String>,
    pub required: bool,
    pub default: Option<serde_json::Value>,
    pub transform: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PromptRole {
    System,
    User,
    Resume,
    Initiation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub model_code: String,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(default, with = "duration_secs_opt")]
    pub timeout: Option<Duration>,
    #[serde(default, with = "duration_secs_opt")]
    pub idle_timeout: Option<Duration>,
    pub max_turns: Option<u32>,
}

impl RuntimeConfig {
    pub fn idle_timeout_or_default(&self) -> Duration {
        self.idle_timeout.unwrap_or(Duration::from_secs(30 * 60))
    }
}

mod duration_secs_opt {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        ser: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => ser.serialize_some(&d.as_secs()),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        de: D,
    ) -> Result<Option<Duration>, D::Error> {
        let secs: Option<u64> = Option::deserialize(de)?;
        Ok(secs.map(Duration::from_secs))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub topic_id: String,
    pub topic_type: TopicType,
    pub category: TopicCategory,
    pub description: String,
    pub response_model_ref: String,
    pub parameter_refs: Vec<ParameterDef>,
    pub is_active: bool,
    pub runtime_config: RuntimeConfig,
}

impl Topic {
    /// Invariant (spec §3.1): a conversation topic must carry `max_turns >= 1`
    /// and a resolvable idle timeout.
    pub fn validate(&self) -> Result<(), String> {
        if self.topic_type == TopicType::ConversationCoaching {
            match self.runtime_config.max_turns {
                Some(n) if n >= 1 => {}
                _ => {
                    return Err(format!(
                        "topic {} is CONVERSATION_COACHING but lacks max_turns >= 1",
                        self.topic_id
                    ))
                }
            }
        }
        let mut seen = std::collections::HashSet::new();
        for p in &self.parameter_refs {
            if !seen.insert(&p.name) {
                return Err(format!(
                    "topic {} has duplicate parameter name {}",
                    self.topic_id, p.name
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TopicFilter {
    pub topic_type: Option<TopicType>,
    pub category: Option<TopicCategory>,
    pub active_only: bool,
}
